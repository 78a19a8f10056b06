pub mod levels;
pub mod search;

use clap::{ArgMatches, Command};
use color_eyre::eyre::Result;
use graytail::config::Config;

/// Register all application commands
pub fn register_commands(app: Command) -> Command {
    app.subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(search::register_command())
        .subcommand(levels::register_command())
}

/// Handle all application commands
pub async fn handle_commands(matches: &ArgMatches, config: &Config) -> Result<()> {
    let environment = crate::global_arg::<String>(matches, "environment").map(String::as_str);

    match matches.subcommand() {
        Some(("search", args)) => search::execute(config, environment, args).await,
        Some(("levels", _)) => levels::execute(),
        _ => {
            println!("Please specify a subcommand. Use --help for more information.");
            Ok(())
        },
    }
}
