//! Query execution against `search/universal/{relative|absolute}`.

use super::{
    error::{Result, SearchError},
    query::SearchQuery,
    range::TimeRange,
    result::{SearchResponse, SearchResult},
    transport::{QueryParams, SearchTransport},
};
use crate::config::ServerTimezone;
use chrono::{DateTime, Local, Utc};
use serde_json::Value;
use tracing::{debug, warn};

/// Largest result set an unlimited query may fetch in one go
pub const MAX_FETCH_ALL: u64 = 10_000;

/// Timestamp layout expected by the absolute endpoint
pub const SERVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub struct SearchClient<T> {
    transport: T,
    timezone: ServerTimezone,
    default_stream: Option<String>,
}

impl<T: SearchTransport> SearchClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, timezone: ServerTimezone::Local, default_stream: None }
    }

    pub fn with_timezone(mut self, timezone: ServerTimezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Stream searched when a query carries no filter of its own
    pub fn with_default_stream(mut self, stream: Option<String>) -> Self {
        self.default_stream = stream;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Timezone set in the profile of `username`, as the server renders
    /// absolute timestamps for that user. `None` when the profile has none or
    /// names a zone this client does not know.
    pub async fn user_timezone(&self, username: &str) -> Result<Option<ServerTimezone>> {
        let profile = self.transport.get_json(&format!("users/{}", username), &[]).await?;
        let Some(zone) = profile.get("timezone").and_then(Value::as_str) else {
            return Ok(None);
        };

        match ServerTimezone::parse(zone) {
            Ok(timezone) => {
                debug!("Using timezone {} from the profile of {}", zone, username);
                Ok(Some(timezone))
            },
            Err(e) => {
                warn!("Ignoring timezone of user {}: {}", username, e);
                Ok(None)
            },
        }
    }

    /// Run `query`.
    ///
    /// With an explicit limit this is a single request. Without one, a probe with
    /// `limit=1` discovers the match count and the searched window, then a second
    /// request fetches every match over exactly that window.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        match query.limit() {
            Some(limit) => self.search_raw(query, query.range(), Some(limit)).await,
            None => self.fetch_all(query).await,
        }
    }

    async fn fetch_all(&self, query: &SearchQuery) -> Result<SearchResult> {
        let probe = self.search_raw(query, query.range(), Some(1)).await?;

        if probe.total_results > MAX_FETCH_ALL {
            return Err(SearchError::TooLarge { total: probe.total_results, max: MAX_FETCH_ALL });
        }
        if probe.total_results == 0 {
            return Ok(probe);
        }

        let (Some(from), Some(to)) = (probe.from, probe.to) else {
            return Err(SearchError::Protocol(
                "probe response does not report the searched window".to_string(),
            ));
        };
        // Reuse the server's window so "now" cannot drift between the two requests
        let window = TimeRange::absolute(from, Some(to));
        let limit = u32::try_from(probe.total_results)
            .map_err(|_| SearchError::Protocol("total_results out of range".to_string()))?;

        let result = self.search_raw(query, &window, Some(limit)).await?;
        if result.entries.len() as u64 != probe.total_results {
            warn!(
                "Probe reported {} matches but fetch returned {}; using fetched entries",
                probe.total_results,
                result.entries.len()
            );
        }

        Ok(result)
    }

    async fn search_raw(
        &self,
        query: &SearchQuery,
        range: &TimeRange,
        limit: Option<u32>,
    ) -> Result<SearchResult> {
        let (path, params) = self.build_request(query, range, limit, Utc::now())?;
        debug!("Searching {} with {:?}", path, params);

        let body = self.transport.get_json(&path, &params).await?;
        let response: SearchResponse =
            serde_json::from_value(body).map_err(|e| SearchError::Protocol(e.to_string()))?;
        SearchResult::try_from(response)
    }

    /// Endpoint path and query string for one request
    pub fn build_request(
        &self,
        query: &SearchQuery,
        range: &TimeRange,
        limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<(String, QueryParams)> {
        let mut params: QueryParams = vec![("query".to_string(), query.text().to_string())];

        let mut push = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                params.push((name.to_string(), value));
            }
        };

        let filter = query
            .filter()
            .map(str::to_string)
            .or_else(|| self.default_stream.as_ref().map(|id| format!("streams:{}", id)));

        push("limit", limit.map(|l| l.to_string()));
        push("offset", query.offset().map(|o| o.to_string()));
        push("filter", filter);
        push("fields", query.fields().map(|fields| fields.join(",")));
        push("sort", query.sort_param());

        let path = if range.is_relative() {
            push("range", Some(range.duration_seconds(now)?.to_string()));
            "search/universal/relative"
        } else {
            let from = range.from().ok_or(SearchError::MissingFrom)?;
            let to = range.to().unwrap_or(now);
            push("from", Some(self.format_server_time(from)));
            push("to", Some(self.format_server_time(to)));
            "search/universal/absolute"
        };

        Ok((path.to_string(), params))
    }

    fn format_server_time(&self, time: DateTime<Utc>) -> String {
        match self.timezone {
            ServerTimezone::Local => time.with_timezone(&Local).format(SERVER_TIME_FORMAT).to_string(),
            ServerTimezone::Fixed(offset) => {
                time.with_timezone(&offset).format(SERVER_TIME_FORMAT).to_string()
            },
            ServerTimezone::Named(zone) => {
                time.with_timezone(&zone).format(SERVER_TIME_FORMAT).to_string()
            },
        }
    }
}
