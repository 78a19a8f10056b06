//! Search responses as returned by `search/universal/*`.

use super::{
    error::{Result, SearchError},
    level::DEFAULT_LEVEL_CODE,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw response body
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub query: Option<String>,
    #[serde(default)]
    pub used_indices: Value,
    pub queried_range: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub time: Option<u64>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub messages: Vec<MessageEnvelope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEnvelope {
    pub message: Map<String, Value>,
    pub index: Option<String>,
}

/// One log entry
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    fields: Map<String, Value>,
    timestamp: Option<DateTime<Utc>>,
    level: u8,
}

impl LogEntry {
    pub fn new(fields: Map<String, Value>) -> Self {
        let timestamp = fields.get("timestamp").and_then(Value::as_str).and_then(parse_timestamp);
        let level = fields
            .get("level")
            .and_then(Value::as_u64)
            .and_then(|code| u8::try_from(code).ok())
            .unwrap_or(DEFAULT_LEVEL_CODE);
        Self { fields, timestamp, level }
    }

    /// Server-assigned unique id
    pub fn id(&self) -> Option<&str> {
        self.fields.get("_id").and_then(Value::as_str)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Numeric syslog severity
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn message(&self) -> &str {
        self.fields.get("message").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Field value rendered as display text; strings are not quoted
    pub fn field_text(&self, name: &str) -> String {
        match self.fields.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Outcome of one [`SearchClient::search`](super::client::SearchClient::search) call
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub query: String,
    pub entries: Vec<LogEntry>,
    pub total_results: u64,
    /// Window the server actually searched
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Server-side elapsed time in milliseconds
    pub elapsed_ms: Option<u64>,
    pub used_indices: Value,
    pub fields: Vec<String>,
}

impl TryFrom<SearchResponse> for SearchResult {
    type Error = SearchError;

    fn try_from(response: SearchResponse) -> Result<Self> {
        let from = response.from.as_deref().map(parse_server_time).transpose()?;
        let to = response.to.as_deref().map(parse_server_time).transpose()?;

        Ok(Self {
            query: response.query.unwrap_or_default(),
            entries: response.messages.into_iter().map(|m| LogEntry::new(m.message)).collect(),
            total_results: response.total_results,
            from,
            to,
            elapsed_ms: response.time,
            used_indices: response.used_indices,
            fields: response.fields,
        })
    }
}

fn parse_server_time(value: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(value)
        .ok_or_else(|| SearchError::Protocol(format!("unparsable timestamp '{}'", value)))
}

/// Graylog sends RFC 3339 timestamps, sometimes with a space instead of `T`
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc3339(&value.replacen(' ', "T", 1)))
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn response_is_converted() {
        let body = json!({
            "query": "*",
            "used_indices": [{"index_name": "graylog_0"}],
            "queried_range": "PT5M",
            "from": "2024-03-10T11:55:00.000Z",
            "to": "2024-03-10T12:00:00.000Z",
            "time": 12,
            "fields": ["message", "source"],
            "total_results": 2,
            "messages": [
                {"index": "graylog_0", "message": {
                    "_id": "b", "message": "second", "level": 3,
                    "timestamp": "2024-03-10T11:59:00.000Z", "source": "web-1"
                }},
                {"index": "graylog_0", "message": {"_id": "a", "message": "first"}}
            ]
        });

        let response: SearchResponse = serde_json::from_value(body).unwrap();
        let result = SearchResult::try_from(response).unwrap();

        assert_eq!(result.query, "*");
        assert_eq!(result.total_results, 2);
        assert_eq!(result.elapsed_ms, Some(12));
        assert_eq!(result.from, Some(Utc.with_ymd_and_hms(2024, 3, 10, 11, 55, 0).unwrap()));
        assert_eq!(result.to, Some(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()));

        let first = &result.entries[0];
        assert_eq!(first.id(), Some("b"));
        assert_eq!(first.level(), 3);
        assert_eq!(first.message(), "second");
        assert_eq!(first.field_text("source"), "web-1");
        assert_eq!(first.timestamp(), Some(Utc.with_ymd_and_hms(2024, 3, 10, 11, 59, 0).unwrap()));

        // Missing level defaults to INFO
        assert_eq!(result.entries[1].level(), 6);
        assert_eq!(result.entries[1].timestamp(), None);
        assert_eq!(result.entries[1].field_text("source"), "");
    }

    #[test]
    fn bad_window_timestamp_is_a_protocol_error() {
        let response: SearchResponse =
            serde_json::from_value(json!({"from": "yesterday-ish", "total_results": 0})).unwrap();
        assert!(matches!(SearchResult::try_from(response), Err(SearchError::Protocol(_))));
    }
}
