//! Live tail: poll a sliding, latency-offset window until cancelled.

use super::printer::LogPrinter;
use crate::format::FormatEntry;
use crate::search::{Result, SearchClient, SearchError, SearchQuery, SearchTransport, TimeRange};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::{io::Write, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Width of every window after the first
pub const WINDOW_SIZE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    Idle,
    Polling,
    Stopped,
    Error,
}

#[derive(Debug, Clone, Copy)]
pub struct TailOptions {
    /// How far behind "now" each window ends, to let the server finish indexing
    pub latency: Duration,
    pub poll_interval: Duration,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self { latency: Duration::from_secs(2), poll_interval: Duration::from_millis(1000) }
    }
}

/// `[now - latency - window, now - latency]`
pub fn next_window(now: DateTime<Utc>, latency: Duration, window: Duration) -> TimeRange {
    let latency = ChronoDuration::from_std(latency).unwrap_or(ChronoDuration::zero());
    let window = ChronoDuration::from_std(window).unwrap_or(ChronoDuration::zero());
    let to = now - latency;
    TimeRange::absolute(to - window, Some(to))
}

pub struct TailLoop<'a, T, F, W: Write> {
    client: &'a SearchClient<T>,
    query: SearchQuery,
    printer: LogPrinter<F, W>,
    options: TailOptions,
    state: TailState,
    iterations: u64,
}

impl<'a, T, F, W> TailLoop<'a, T, F, W>
where
    T: SearchTransport,
    F: FormatEntry,
    W: Write,
{
    /// Fails when `query` carries an explicit limit; a tail has to see every match.
    pub fn new(
        client: &'a SearchClient<T>,
        query: SearchQuery,
        printer: LogPrinter<F, W>,
        options: TailOptions,
    ) -> Result<Self> {
        if let Some(limit) = query.limit() {
            return Err(SearchError::FollowWithLimit(limit));
        }
        Ok(Self { client, query, printer, options, state: TailState::Idle, iterations: 0 })
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    /// Completed iterations
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Poll until `cancel` fires. Cancellation is only observed between
    /// iterations, after the current batch has been written. Any search or
    /// output error ends the session.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.state != TailState::Idle {
            return Err(SearchError::Protocol(format!("tail loop cannot start from {:?}", self.state)));
        }
        self.state = TailState::Polling;
        info!("Following query '{}'", self.query.text());

        loop {
            if let Err(e) = self.iterate().await {
                self.state = TailState::Error;
                return Err(e);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.options.poll_interval) => {},
            }
        }

        self.state = TailState::Stopped;
        info!("Stopped following after {} polls", self.iterations);
        Ok(())
    }

    async fn iterate(&mut self) -> Result<()> {
        let result = self.client.search(&self.query).await?;
        self.printer.print_result(&result)?;
        self.iterations += 1;

        let window = next_window(Utc::now(), self.options.latency, WINDOW_SIZE);
        debug!("Next window {:?} .. {:?}", window.from(), window.to());
        self.query = self.query.with_range(window);
        Ok(())
    }

    pub fn into_printer(self) -> LogPrinter<F, W> {
        self.printer
    }
}
