//! Graytail - Graylog search and live tail
//!
//! Command-line entry point: loads configuration, sets up logging and
//! dispatches to the subcommands.

mod commands;

use clap::{Arg, ArgMatches, Command, value_parser};
use graytail::{
    config::{Config, LoggingConfig},
    error,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    error::install_error_handlers()?;

    // Define base CLI structure
    let base_app = Command::new("graytail")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Official Unofficial, Inc.")
        .about("Search and live-tail a Graylog server")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML config file (default: $GRAYTAIL_CONFIG)"),
        )
        .arg(
            Arg::new("environment")
                .long("environment")
                .short('e')
                .global(true)
                .help("Label of a configured Graylog environment"),
        );

    // Register all command modules
    let app = commands::register_commands(base_app);

    // Parse command line arguments
    let matches = app.get_matches();

    // Load configuration from file and/or environment variables
    let config_path = global_arg::<PathBuf>(&matches, "config");
    let config = Config::load_from(config_path.map(PathBuf::as_path))
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid configuration: {}", e))?;

    init_logging(&config.logging);

    // Handle commands based on matches
    commands::handle_commands(&matches, &config).await?;

    debug!("Execution completed successfully");
    Ok(())
}

/// Global args land in whichever matches they were given on
pub(crate) fn global_arg<'m, T: Clone + Send + Sync + 'static>(
    matches: &'m ArgMatches,
    name: &str,
) -> Option<&'m T> {
    matches
        .subcommand()
        .and_then(|(_, sub)| sub.get_one::<T>(name))
        .or_else(|| matches.get_one::<T>(name))
}

/// Diagnostics go to stderr; stdout carries the log entries
fn init_logging(logging: &LoggingConfig) {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.default_level));

    // Apply dependency filters if configured
    if let Some(dep_filter) = &logging.dependency_filter {
        let filter_string = format!("{},{}", env_filter, dep_filter);
        env_filter = EnvFilter::try_new(&filter_string).unwrap_or(env_filter);
    }

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)).init();
    }
}
