//! Search-layer error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("the given log level ({name}) is invalid, use one of the following: {allowed}")]
    InvalidLevel { name: String, allowed: String },

    #[error("cannot parse time expression '{0}'")]
    InvalidTime(String),

    #[error("a relative range needs a start time")]
    MissingFrom,

    #[error("absolute range has no end time; resolve it before computing a duration")]
    UnresolvedRange,

    #[error("follow mode requires a query without an explicit limit (got limit {0})")]
    FollowWithLimit(u32),

    #[error(
        "query returns {total} log entries, more than the {max} allowed; use --limit and --offset to query in chunks"
    )]
    TooLarge { total: u64, max: u64 },

    #[error("API error: URL: {url} Status: 401 Message: user authorization denied")]
    Unauthorized { url: String },

    #[error("API error: URL: {url} Status: {status} Message: {body}")]
    Http { url: String, status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected server response: {0}")]
    Protocol(String),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
