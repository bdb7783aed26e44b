use std::time::Duration;

use crate::errors::ConfigError;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_WS_URL: &str = "ws://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Retry schedule for conversation sockets that drop unexpectedly.
///
/// `max_attempts == 0` disables reconnection, which is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    pub const DISABLED: Self = Self {
        max_attempts: 0,
        base_delay: Duration::from_millis(500),
        max_delay: Duration::from_secs(30),
    };

    pub fn with_attempts(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::DISABLED }
    }

    /// Delay before reconnect attempt number `attempt` (1-based), or `None` once exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// Origins and timeouts for talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub ws_base_url: String,
    pub request_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL, DEFAULT_WS_URL)
    }
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>, ws_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: trim_origin(api_base_url.into()),
            ws_base_url: trim_origin(ws_base_url.into()),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Reads `API_BASE_URL`, `WS_URL`, `REQUEST_TIMEOUT_SECS` and `WS_RECONNECT_ATTEMPTS`,
    /// loading a `.env` file first when one is present.
    #[cfg(feature = "native")]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same variables as [`ClientConfig::from_env`], captured at compile time for
    /// targets without a process environment (the browser build).
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| {
            let value = match name {
                "API_BASE_URL" => option_env!("API_BASE_URL"),
                "WS_URL" => option_env!("WS_URL"),
                "REQUEST_TIMEOUT_SECS" => option_env!("REQUEST_TIMEOUT_SECS"),
                "WS_RECONNECT_ATTEMPTS" => option_env!("WS_RECONNECT_ATTEMPTS"),
                _ => None,
            };
            value.map(str::to_string)
        })
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new(
            lookup("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            lookup("WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
        );
        if let Some(raw) = lookup("REQUEST_TIMEOUT_SECS") {
            let secs = parse_number(&raw, "REQUEST_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("WS_RECONNECT_ATTEMPTS") {
            let attempts = parse_number(&raw, "WS_RECONNECT_ATTEMPTS")?;
            let attempts = u32::try_from(attempts).map_err(|_| ConfigError::InvalidValue {
                name: "WS_RECONNECT_ATTEMPTS",
                value: raw.clone(),
            })?;
            config.reconnect = ReconnectPolicy::with_attempts(attempts);
        }
        Ok(config)
    }

    /// Resolves a REST path or an absolute cursor URL against the API origin.
    pub fn api_url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else if path_or_url.starts_with('/') {
            format!("{}{path_or_url}", self.api_base_url)
        } else {
            format!("{}/{path_or_url}", self.api_base_url)
        }
    }

    /// Socket URL for `path`, authenticated with `token` as a query parameter.
    pub fn socket_url(&self, path: &str, token: &str) -> String {
        format!("{}{path}?token={token}", self.ws_base_url)
    }
}

fn trim_origin(origin: String) -> String {
    origin.trim_end_matches('/').to_string()
}

fn parse_number(raw: &str, name: &'static str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value: raw.to_string() })
}
