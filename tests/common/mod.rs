#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use graytail::search::{Result, SearchTransport, transport::QueryParams};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

pub const WINDOW_FROM: &str = "2024-03-10T11:59:55.000Z";
pub const WINDOW_TO: &str = "2024-03-10T12:00:00.000Z";

/// Serves queued responses in order and records every request it sees
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<(String, QueryParams)>>,
    responses: Mutex<VecDeque<Result<Value>>>,
    cancel_at: Option<(usize, CancellationToken)>,
}

impl MockTransport {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        Self { responses: Mutex::new(responses.into()), ..Default::default() }
    }

    /// Cancel `token` once the `nth` request (1-based) has been served
    pub fn cancel_after(mut self, nth: usize, token: CancellationToken) -> Self {
        self.cancel_at = Some((nth, token));
        self
    }

    pub fn requests(&self) -> Vec<(String, QueryParams)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchTransport for MockTransport {
    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let served = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((path.to_string(), params.to_vec()));
            requests.len()
        };
        if let Some((nth, token)) = &self.cancel_at {
            if served == *nth {
                token.cancel();
            }
        }

        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| Ok(body(0, &[])))
    }
}

/// Response body reporting `total` matches and carrying one message per id,
/// newest first as the server sends them
pub fn body(total: u64, ids: &[&str]) -> Value {
    let messages: Vec<Value> = ids
        .iter()
        .map(|id| json!({"index": "graylog_0", "message": {"_id": id, "message": id, "level": 6}}))
        .collect();
    json!({
        "query": "*",
        "used_indices": [],
        "from": WINDOW_FROM,
        "to": WINDOW_TO,
        "time": 3,
        "fields": ["message"],
        "total_results": total,
        "messages": messages,
    })
}

pub fn param<'a>(params: &'a QueryParams, name: &str) -> Option<&'a str> {
    params.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
}
