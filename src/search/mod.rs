//! Query model and execution against the Graylog search API.

pub mod client;
pub mod error;
pub mod level;
pub mod query;
pub mod range;
pub mod result;
pub mod transport;

pub use client::{MAX_FETCH_ALL, SearchClient};
pub use error::{Result, SearchError};
pub use level::LogLevel;
pub use query::{SearchQuery, SearchQueryBuilder};
pub use range::TimeRange;
pub use result::{LogEntry, SearchResult};
pub use transport::{HttpTransport, SearchTransport};
