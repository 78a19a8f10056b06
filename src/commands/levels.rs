use clap::Command;
use color_eyre::eyre::Result;
use graytail::search::LogLevel;

/// Register levels command
pub fn register_command() -> Command {
    Command::new("levels").about("List the log level names accepted in `level:<NAME>` filters")
}

pub fn execute() -> Result<()> {
    for level in LogLevel::ALL {
        println!("{}  {}", level.code(), level.name());
    }
    Ok(())
}
