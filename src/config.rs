//! Configuration management for the application
use chrono::FixedOffset;
use chrono_tz::Tz;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, time::Duration};
use thiserror::Error;
use url::Url;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Timezone the server interprets absolute timestamps in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerTimezone {
    Local,
    Fixed(FixedOffset),
    /// IANA zone, as reported by the Graylog user profile
    Named(Tz),
}

impl ServerTimezone {
    /// Parse `local`, `UTC`/`Z`, a fixed offset such as `+02:00` or an IANA
    /// name such as `Europe/Berlin`
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        let (sign, rest) = match trimmed.to_ascii_lowercase().as_str() {
            "local" | "" => return Ok(ServerTimezone::Local),
            "utc" | "z" | "gmt" => (1, "0"),
            _ if !trimmed.starts_with(['+', '-']) => {
                return trimmed
                    .parse::<Tz>()
                    .map(ServerTimezone::Named)
                    .map_err(|_| ConfigError::InvalidValue(format!("unknown timezone '{}'", value)));
            },
            _ => Self::split_sign(trimmed, value)?,
        };
        let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
        let hours: i32 = hours
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("unknown timezone '{}'", value)))?;
        let minutes: i32 = minutes
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("unknown timezone '{}'", value)))?;

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(ServerTimezone::Fixed)
            .ok_or_else(|| ConfigError::InvalidValue(format!("timezone out of range '{}'", value)))
    }

    fn split_sign<'a>(trimmed: &'a str, value: &str) -> Result<(i32, &'a str), ConfigError> {
        if let Some(rest) = trimmed.strip_prefix('+') {
            Ok((1, rest))
        } else if let Some(rest) = trimmed.strip_prefix('-') {
            Ok((-1, rest))
        } else {
            Err(ConfigError::InvalidValue(format!("unknown timezone '{}'", value)))
        }
    }
}

/// Graylog server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    /// Defaults to 443 with TLS and 80 without
    pub port: Option<u16>,
    #[serde(default = "default_tls")]
    pub tls: bool,
    #[serde(default = "default_api_path")]
    pub api_path: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `local`, `UTC`, a fixed offset or an IANA name; absolute ranges are sent
    /// in this zone. When unset, the zone of the Graylog user is used.
    pub timezone: Option<String>,
    pub default_stream: Option<String>,
    pub proxy: Option<String>,
    #[serde(default)]
    pub insecure_https: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_tls() -> bool {
    true
}

fn default_api_path() -> String {
    "api/".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            tls: default_tls(),
            api_path: default_api_path(),
            username: None,
            password: None,
            timezone: None,
            default_stream: None,
            proxy: None,
            insecure_https: false,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ServerConfig {
    pub fn scheme(&self) -> &'static str {
        if self.tls { "https" } else { "http" }
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.tls { 443 } else { 80 })
    }

    /// Base URL of the REST API, always ending in a slash
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut api_path = self.api_path.trim_start_matches('/').to_string();
        if !api_path.is_empty() && !api_path.ends_with('/') {
            api_path.push('/');
        }

        let raw = format!("{}://{}:{}/{}", self.scheme(), self.host, self.effective_port(), api_path);
        Url::parse(&raw).map_err(|e| ConfigError::InvalidValue(format!("{}: {}", raw, e)))
    }

    /// Configured zone override, if any
    pub fn server_timezone(&self) -> Result<Option<ServerTimezone>, ConfigError> {
        self.timezone.as_deref().map(ServerTimezone::parse).transpose()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingConfig("Server host is required".to_string()));
        }
        self.server_timezone()?;
        self.base_url()?;
        Ok(())
    }
}

/// Batch search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Values `<= 0` mean unlimited
    pub default_limit: i64,
    pub default_from: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_limit: 100, default_from: "5 minutes ago".to_string() }
    }
}

/// Live-tail defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailConfig {
    pub latency_seconds: u64,
    pub poll_interval_ms: u64,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self { latency_seconds: 2, poll_interval_ms: 1000 }
    }
}

/// Output formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    pub template: String,
    pub color: bool,
    /// Named templates selectable with `--format-template`
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
}

pub const DEFAULT_TEMPLATE: &str = "{timestamp} {level} {source} {facility} {message}";

impl Default for FormatConfig {
    fn default() -> Self {
        Self { template: DEFAULT_TEMPLATE.to_string(), color: true, templates: BTreeMap::new() }
    }
}

impl FormatConfig {
    /// Resolve a template by name, falling back to the configured default
    pub fn template_named(&self, name: Option<&str>) -> &str {
        match name {
            None | Some("default") => &self.template,
            Some(name) => self.templates.get(name).map(String::as_str).unwrap_or(&self.template),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging format: "json" or "text"
    pub format: String,
    /// Default log level if no RUST_LOG is set
    pub default_level: String,
    /// Custom filter for dependency logs
    pub dependency_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            default_level: "warn".to_string(),
            dependency_filter: Some(
                "hyper=warn,hyper_util=warn,reqwest=warn,h2=warn,rustls=warn,mio=warn".to_string(),
            ),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub environments: BTreeMap<String, ServerConfig>,
    pub search: SearchConfig,
    pub tail: TailConfig,
    pub format: FormatConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration, preferring `path` over `GRAYTAIL_CONFIG` for the TOML file
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv().ok();

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("GRAYTAIL_").split("__"));

        // The config file location itself can only come from the environment or the CLI
        let env_path = std::env::var_os("GRAYTAIL_CONFIG");
        let file = path.or_else(|| env_path.as_deref().map(Path::new));
        if let Some(file) = file {
            if !file.exists() {
                return Err(ConfigError::LoadError(format!(
                    "config file {} does not exist",
                    file.display()
                )));
            }
            figment = figment.merge(Toml::file(file));
        }

        figment.extract().map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Server settings for a named environment, or the top-level `server` section
    pub fn server_for(&self, environment: Option<&str>) -> Result<&ServerConfig, ConfigError> {
        match environment {
            None => Ok(&self.server),
            Some(name) => self.environments.get(name).ok_or_else(|| {
                ConfigError::MissingConfig(format!("no environment named '{}' is configured", name))
            }),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        for (name, server) in &self.environments {
            server
                .validate()
                .map_err(|e| ConfigError::InvalidValue(format!("environment '{}': {}", name, e)))?;
        }
        if self.tail.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue("tail.poll_interval_ms must be > 0".to_string()));
        }
        Ok(())
    }
}
