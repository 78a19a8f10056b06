//! Printing of search results, once or continuously.

pub mod dedup;
pub mod follow;
pub mod printer;

pub use dedup::{DEDUP_CAPACITY, DedupWindow};
pub use follow::{TailLoop, TailOptions, TailState, WINDOW_SIZE, next_window};
pub use printer::{LogPrinter, OutputSink};
