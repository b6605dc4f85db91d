use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Public Daily REST API endpoint.
pub const DEFAULT_DAILY_API_URL: &str = "https://api.daily.co/v1";

fn default_api_url() -> String {
    DEFAULT_DAILY_API_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DailyConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Timeout for each REST request in milliseconds. Default: 10000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl fmt::Debug for DailyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DailyConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl DailyConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// API base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}
