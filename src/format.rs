//! Rendering of log entries for display.
use crate::search::{LogEntry, LogLevel};
use chrono::Local;
use once_cell::sync::Lazy;
use owo_colors::OwoColorize;
use regex::{Captures, Regex};

pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub const DEFAULT_DUMP_FIELDS: [&str; 5] = ["timestamp", "level", "message", "source", "facility"];

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_.\-]+)\}").expect("placeholder regex"));

/// Turns one entry into one line of output
pub trait FormatEntry {
    fn format(&self, entry: &LogEntry) -> String;
}

impl<F> FormatEntry for F
where
    F: Fn(&LogEntry) -> String,
{
    fn format(&self, entry: &LogEntry) -> String {
        self(entry)
    }
}

/// Output style, chosen once at startup
#[derive(Debug, Clone)]
pub enum Formatter {
    Tail(TailFormat),
    Dump(DumpFormat),
}

impl Formatter {
    /// Fields the server has to return for this formatter
    pub fn fields(&self) -> Vec<String> {
        match self {
            Formatter::Tail(tail) => tail.fields(),
            Formatter::Dump(dump) => dump.fields.clone(),
        }
    }
}

impl FormatEntry for Formatter {
    fn format(&self, entry: &LogEntry) -> String {
        match self {
            Formatter::Tail(tail) => tail.format(entry),
            Formatter::Dump(dump) => dump.format(entry),
        }
    }
}

/// Template based line, e.g. `{timestamp} {level} {message}`
#[derive(Debug, Clone)]
pub struct TailFormat {
    template: String,
    color: bool,
}

impl TailFormat {
    pub fn new(template: impl Into<String>, color: bool) -> Self {
        Self { template: template.into(), color }
    }

    /// Placeholder names in template order, without repeats
    pub fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for captures in PLACEHOLDER.captures_iter(&self.template) {
            let name = &captures[1];
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        }
        fields
    }
}

impl FormatEntry for TailFormat {
    fn format(&self, entry: &LogEntry) -> String {
        let line = PLACEHOLDER
            .replace_all(&self.template, |captures: &Captures| field_value(entry, &captures[1]))
            .into_owned();

        if self.color { colorize(&line, entry.level()) } else { line }
    }
}

/// `'value';'value'` over a fixed field list
#[derive(Debug, Clone)]
pub struct DumpFormat {
    fields: Vec<String>,
}

impl DumpFormat {
    pub fn new(fields: Option<Vec<String>>) -> Self {
        let fields = fields
            .filter(|fields| !fields.is_empty())
            .unwrap_or_else(|| DEFAULT_DUMP_FIELDS.iter().map(|f| f.to_string()).collect());
        Self { fields }
    }
}

impl FormatEntry for DumpFormat {
    fn format(&self, entry: &LogEntry) -> String {
        self.fields
            .iter()
            .map(|field| format!("'{}'", field_value(entry, field)))
            .collect::<Vec<_>>()
            .join(";")
    }
}

fn field_value(entry: &LogEntry, name: &str) -> String {
    match name {
        "timestamp" => match entry.timestamp() {
            Some(ts) => ts.with_timezone(&Local).format(DISPLAY_TIME_FORMAT).to_string(),
            None => entry.field_text("timestamp"),
        },
        "level" => LogLevel::from_code(entry.level()).map(|l| l.name().to_string()).unwrap_or_default(),
        "message" => entry.message().to_string(),
        other => entry.field_text(other),
    }
}

fn colorize(line: &str, level: u8) -> String {
    match LogLevel::from_code(level) {
        Some(LogLevel::Critical) => line.white().on_red().to_string(),
        Some(LogLevel::Error) => line.red().to_string(),
        Some(LogLevel::Warning) => line.yellow().to_string(),
        Some(LogLevel::Debug) => line.cyan().to_string(),
        // Notice, info and unknown codes
        _ => line.green().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn entry(level: u8) -> LogEntry {
        let value = json!({
            "_id": "abc",
            "level": level,
            "message": "dummy message",
            "source": "dummy.source",
            "timestamp": "2024-03-10T12:00:00.250Z",
            "a": 1
        });
        LogEntry::new(value.as_object().unwrap().clone())
    }

    #[test]
    fn tail_format_substitutes_placeholders() {
        let format = TailFormat::new("({source}) - {message}", false);
        assert_eq!(format.format(&entry(7)), "(dummy.source) - dummy message");

        let format = TailFormat::new("({level}) - {message} a={a} missing={nope}", false);
        assert_eq!(format.format(&entry(7)), "(DEBUG) - dummy message a=1 missing=");
    }

    #[test]
    fn tail_format_renders_local_timestamp() {
        let format = TailFormat::new("{timestamp}", false);
        let expected = Utc
            .with_ymd_and_hms(2024, 3, 10, 12, 0, 0)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(250))
            .unwrap()
            .with_timezone(&Local)
            .format(DISPLAY_TIME_FORMAT)
            .to_string();
        assert_eq!(format.format(&entry(6)), expected);
    }

    #[test]
    fn tail_format_colors_by_level() {
        let format = TailFormat::new("{message}", true);
        assert_eq!(format.format(&entry(3)), "dummy message".red().to_string());
        assert_eq!(format.format(&entry(4)), "dummy message".yellow().to_string());
        assert_eq!(format.format(&entry(6)), "dummy message".green().to_string());
        assert_eq!(format.format(&entry(7)), "dummy message".cyan().to_string());
        assert_eq!(format.format(&entry(2)), "dummy message".white().on_red().to_string());
        assert_eq!(format.format(&entry(1)), "dummy message".green().to_string());
    }

    #[test]
    fn unknown_level_renders_empty_name() {
        let format = TailFormat::new("[{level}]", false);
        assert_eq!(format.format(&entry(0)), "[]");
    }

    #[test]
    fn template_fields_are_deduplicated() {
        let format = TailFormat::new("{level} {message} {level} {host}", false);
        assert_eq!(format.fields(), vec!["level", "message", "host"]);
    }

    #[test]
    fn dump_format() {
        let dump = DumpFormat::new(Some(vec!["level".to_string(), "source".to_string(), "a".to_string()]));
        assert_eq!(dump.format(&entry(3)), "'ERROR';'dummy.source';'1'");

        let default = Formatter::Dump(DumpFormat::new(None));
        assert_eq!(default.fields(), DEFAULT_DUMP_FIELDS.to_vec());
    }

    #[test]
    fn closures_are_formatters() {
        let ids = |entry: &LogEntry| entry.id().unwrap_or("-").to_string();
        assert_eq!(ids.format(&entry(6)), "abc");
    }
}
