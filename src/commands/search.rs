use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use color_eyre::eyre::{Result, eyre};
use graytail::{
    config::{Config, ServerTimezone},
    format::{DumpFormat, Formatter, TailFormat},
    search::{HttpTransport, SearchClient, SearchQuery, SearchTransport, TimeRange},
    tail::{LogPrinter, OutputSink, TailLoop, TailOptions, next_window},
};
use std::{io::Write, path::PathBuf, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Width of the first follow window
const INITIAL_FOLLOW_WINDOW: Duration = Duration::from_secs(1);

/// Register search command
pub fn register_command() -> Command {
    Command::new("search")
        .about("Search log entries, once or continuously with --follow")
        .arg(Arg::new("query").default_value("*").help("Graylog search query"))
        .arg(
            Arg::new("from")
                .long("from")
                .help("Range start, absolute or relative (e.g. \"10 minutes ago\")"),
        )
        .arg(Arg::new("to").long("to").help("Range end (default: now)"))
        .arg(
            Arg::new("relative")
                .long("relative")
                .action(ArgAction::SetTrue)
                .help("Send the range as \"last N seconds\" and let the server resolve now"),
        )
        .arg(
            Arg::new("follow")
                .long("follow")
                .short('f')
                .action(ArgAction::SetTrue)
                .conflicts_with_all(["from", "to", "relative", "sort"])
                .help("Poll the server for new entries matching the query"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .short('n')
                .value_parser(value_parser!(i64))
                .help("Limit the number of results; <= 0 fetches everything (default: 100)"),
        )
        .arg(
            Arg::new("offset")
                .long("offset")
                .value_parser(value_parser!(u32))
                .help("Skip this many results"),
        )
        .arg(Arg::new("stream").long("stream").help("Stream id to search, * for all streams"))
        .arg(Arg::new("sort").long("sort").short('s').help("Field to sort by"))
        .arg(
            Arg::new("asc")
                .long("asc")
                .action(ArgAction::SetTrue)
                .help("Sort ascending instead of descending"),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .short('d')
                .action(ArgAction::SetTrue)
                .help("Print entries as quoted, semicolon separated fields"),
        )
        .arg(
            Arg::new("fields")
                .long("fields")
                .value_delimiter(',')
                .help("Comma separated fields for --dump"),
        )
        .arg(
            Arg::new("format-template")
                .long("format-template")
                .short('r')
                .help("Name of a configured message template"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .action(ArgAction::SetTrue)
                .help("Don't color entries by level"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_parser(value_parser!(PathBuf))
                .help("Append entries to this file instead of stdout"),
        )
        .arg(
            Arg::new("latency")
                .long("latency")
                .short('a')
                .value_parser(value_parser!(u64))
                .help("Seconds the follow window trails behind now"),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_parser(value_parser!(u64).range(1..))
                .help("Milliseconds between follow polls"),
        )
}

/// Run a batch search or follow the query until Ctrl+C
pub async fn execute(config: &Config, environment: Option<&str>, args: &ArgMatches) -> Result<()> {
    let server = config.server_for(environment)?;
    server.validate()?;

    let follow = args.get_flag("follow");
    let options = TailOptions {
        latency: Duration::from_secs(
            args.get_one::<u64>("latency").copied().unwrap_or(config.tail.latency_seconds),
        ),
        poll_interval: Duration::from_millis(
            args.get_one::<u64>("interval").copied().unwrap_or(config.tail.poll_interval_ms),
        ),
    };

    // "*" searches every stream, overriding the configured default stream
    let stream = args.get_one::<String>("stream");
    let all_streams = stream.is_some_and(|s| s == "*");
    let filter = stream.filter(|_| !all_streams).map(|s| format!("streams:{}", s));
    let default_stream = if all_streams { None } else { server.default_stream.clone() };

    let client = SearchClient::new(HttpTransport::new(server)?).with_default_stream(default_stream);
    // A configured zone wins over the one in the user's profile
    let timezone = match (server.server_timezone()?, &server.username) {
        (Some(timezone), _) => timezone,
        (None, Some(username)) => client.user_timezone(username).await?.unwrap_or(ServerTimezone::Local),
        (None, None) => ServerTimezone::Local,
    };
    let client = client.with_timezone(timezone);

    let formatter = build_formatter(config, args);
    let range = if follow {
        next_window(chrono::Utc::now(), options.latency, INITIAL_FOLLOW_WINDOW)
    } else {
        let from = args.get_one::<String>("from").unwrap_or(&config.search.default_from);
        TimeRange::parse(
            Some(from.as_str()),
            args.get_one::<String>("to").map(String::as_str),
            args.get_flag("relative"),
        )?
    };

    let query_text = args.get_one::<String>("query").map(String::as_str).unwrap_or("*");
    let query = SearchQuery::builder(range, query_text)
        .with_limit(resolve_limit(config, args, follow)?)
        .with_offset(args.get_one::<u32>("offset").copied())
        .with_filter(filter)
        .with_fields(Some(formatter.fields()))
        .with_sort(args.get_one::<String>("sort").cloned(), args.get_flag("asc"))
        .build()?;

    let sink = match args.get_one::<PathBuf>("output") {
        Some(path) => OutputSink::append_to(path)?,
        None => OutputSink::stdout(),
    };
    let printer = LogPrinter::new(formatter, sink);

    if follow {
        run_follow(&client, query, printer, options).await
    } else {
        run_batch(&client, &query, printer).await
    }
}

async fn run_batch<T, W>(
    client: &SearchClient<T>,
    query: &SearchQuery,
    mut printer: LogPrinter<Formatter, W>,
) -> Result<()>
where
    T: SearchTransport,
    W: Write,
{
    let result = client.search(query).await?;
    let printed = printer.print_result(&result)?;
    printer.into_sink()?;

    info!(
        "Printed {} entries ({} total matches, {}ms on server)",
        printed,
        result.total_results,
        result.elapsed_ms.unwrap_or_default()
    );
    Ok(())
}

async fn run_follow<T, W>(
    client: &SearchClient<T>,
    query: SearchQuery,
    printer: LogPrinter<Formatter, W>,
    options: TailOptions,
) -> Result<()>
where
    T: SearchTransport,
    W: Write,
{
    let mut tail = TailLoop::new(client, query, printer, options)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    tail.run(&cancel).await?;
    tail.into_printer().into_sink()?;
    eprintln!("\nInterrupted follow mode. Exiting...");
    Ok(())
}

fn build_formatter(config: &Config, args: &ArgMatches) -> Formatter {
    if args.get_flag("dump") {
        let fields = args.get_many::<String>("fields").map(|fields| fields.cloned().collect());
        Formatter::Dump(DumpFormat::new(fields))
    } else {
        let template = config
            .format
            .template_named(args.get_one::<String>("format-template").map(String::as_str));
        let color = config.format.color && !args.get_flag("no-color");
        Formatter::Tail(TailFormat::new(template, color))
    }
}

/// Follow mode only limits when asked to, and `TailLoop` rejects that
fn resolve_limit(config: &Config, args: &ArgMatches, follow: bool) -> Result<Option<u32>> {
    let limit = match (args.get_one::<i64>("limit").copied(), follow) {
        (Some(limit), _) => limit,
        (None, false) => config.search.default_limit,
        (None, true) => return Ok(None),
    };
    if limit <= 0 {
        return Ok(None);
    }
    u32::try_from(limit)
        .map(Some)
        .map_err(|_| eyre!("limit {} is out of range, the maximum is {}", limit, u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> ArgMatches {
        register_command().try_get_matches_from(argv).unwrap()
    }

    #[test]
    fn limit_defaults_to_config_in_batch_mode() {
        let config = Config::default();
        assert_eq!(resolve_limit(&config, &parse(&["search"]), false).unwrap(), Some(100));
        assert_eq!(resolve_limit(&config, &parse(&["search", "-n", "25"]), false).unwrap(), Some(25));
        assert_eq!(resolve_limit(&config, &parse(&["search", "-n", "0"]), false).unwrap(), None);
        assert_eq!(resolve_limit(&config, &parse(&["search", "-f"]), true).unwrap(), None);
    }

    #[test]
    fn oversized_limit_is_an_error() {
        let config = Config::default();
        let args = parse(&["search", "--limit", "5000000000"]);
        assert!(resolve_limit(&config, &args, false).is_err());

        let args = parse(&["search", "-f", "--limit", "5000000000"]);
        assert!(resolve_limit(&config, &args, true).is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(register_command().try_get_matches_from(["search", "-f", "--interval", "0"]).is_err());
        assert!(register_command().try_get_matches_from(["search", "-f", "--interval", "250"]).is_ok());
    }

    #[test]
    fn follow_conflicts_with_explicit_range() {
        assert!(register_command().try_get_matches_from(["search", "-f", "--from", "1 hour ago"]).is_err());
    }
}
