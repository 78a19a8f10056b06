//! Graytail - Graylog search and live tail
//!
//! Builds search queries over absolute or relative time windows, executes them
//! against the Graylog universal search API and prints the matching entries,
//! either once or continuously by polling a sliding window.

pub mod config;
pub mod error;
pub mod format;
pub mod search;
pub mod tail;
