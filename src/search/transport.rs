//! HTTP transport for the Graylog REST API.

use super::error::{Result, SearchError};
use crate::config::ServerConfig;
use async_trait::async_trait;
use reqwest::{
    Client, Proxy, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Ordered query string; repeated names are allowed
pub type QueryParams = Vec<(String, String)>;

/// Issues GET requests against the API and returns the decoded JSON body
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// `path` is relative to the API base URL
    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value>;
}

pub struct HttpTransport {
    http_client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.insecure_https);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            http_client: builder.build()?,
            base_url: config.base_url()?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let url = self.base_url.join(path)?;
        debug!("GET {} {:?}", url, params);

        let mut request = self.http_client.get(url.clone()).query(params);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SearchError::Unauthorized { url: url.to_string() });
        }
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to read error response from {}: {}", url, e);
                    format!("<unreadable body: {}>", e)
                },
            };
            return Err(SearchError::Http { url: url.to_string(), status: status.as_u16(), body });
        }

        Ok(response.json::<Value>().await?)
    }
}
