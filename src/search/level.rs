//! Syslog severity vocabulary used in filters and output.

use std::fmt;

/// Code reported when an entry carries no `level` field
pub const DEFAULT_LEVEL_CODE: u8 = LogLevel::Info as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Notice,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Critical => "CRITICAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Notice => "NOTICE",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.name().eq_ignore_ascii_case(name))
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }

    /// Comma separated vocabulary for error messages
    pub fn vocabulary() -> String {
        Self::ALL.iter().map(|level| level.name()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_case_insensitively() {
        assert_eq!(LogLevel::from_name("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_name("WaRnInG"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_name("bogus"), None);
    }

    #[test]
    fn codes_follow_syslog() {
        assert_eq!(LogLevel::Critical.code(), 2);
        assert_eq!(LogLevel::Debug.code(), 7);
        assert_eq!(LogLevel::from_code(3), Some(LogLevel::Error));
        // Emergency and alert are outside the vocabulary
        assert_eq!(LogLevel::from_code(0), None);
        assert_eq!(DEFAULT_LEVEL_CODE, 6);
    }

    #[test]
    fn vocabulary_lists_all_levels() {
        assert_eq!(LogLevel::vocabulary(), "CRITICAL, ERROR, WARNING, NOTICE, INFO, DEBUG");
    }
}
