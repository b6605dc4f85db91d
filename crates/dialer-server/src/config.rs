//! Server configuration loading from file and environment variables.

use dialer_types::DEFAULT_MAX_DIALOUT_ATTEMPTS;
use dialer_voice::DailyConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Daily REST API settings.
    #[serde(default)]
    pub daily: DailyConfig,

    /// Dial-out policy.
    #[serde(default)]
    pub dialout: DialoutConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "dialer_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Dial-out policy and provisioning settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DialoutConfig {
    /// Maximum dial attempts per session, including the first. Must be >= 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// SIP domain used to build `sip:{number}@{domain}` for provisioned calls.
    #[serde(default)]
    pub sip_domain: String,

    /// Lifetime of provisioned rooms and tokens, in seconds.
    #[serde(default = "default_room_ttl_seconds")]
    pub room_ttl_seconds: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    7860
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_DIALOUT_ATTEMPTS
}

fn default_room_ttl_seconds() -> u64 {
    2 * 60 * 60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for DialoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            sip_domain: String::new(),
            room_ttl_seconds: default_room_ttl_seconds(),
        }
    }
}

impl DialoutConfig {
    /// The validated attempt budget.
    pub fn max_attempts(&self) -> Result<NonZeroU32, ConfigError> {
        NonZeroU32::new(self.max_attempts)
            .ok_or_else(|| ConfigError::Invalid("dialout.max_attempts must be at least 1".into()))
    }

    pub fn room_ttl(&self) -> Duration {
        Duration::from_secs(self.room_ttl_seconds)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `DIALER_HOST` overrides `server.host`
/// - `DIALER_PORT` overrides `server.port`
/// - `DIALER_LOG_LEVEL` overrides `logging.level`
/// - `DIALER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `DIALER_API_URL` overrides `daily.api_url`
/// - `DIALER_API_KEY` overrides `daily.api_key`
/// - `DIALER_SIP_DOMAIN` overrides `dialout.sip_domain`
/// - `DIALER_MAX_ATTEMPTS` overrides `dialout.max_attempts`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the resulting configuration is invalid.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.dialout.max_attempts()?;

    Ok(config)
}

/// Applies `DIALER_*` overrides read through `lookup`.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(host) = lookup("DIALER_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("DIALER_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("DIALER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("DIALER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(api_url) = lookup("DIALER_API_URL") {
        config.daily.api_url = api_url;
    }
    if let Some(api_key) = lookup("DIALER_API_KEY") {
        config.daily.api_key = api_key;
    }
    if let Some(sip_domain) = lookup("DIALER_SIP_DOMAIN") {
        config.dialout.sip_domain = sip_domain;
    }
    if let Some(max_attempts) = lookup("DIALER_MAX_ATTEMPTS") {
        config.dialout.max_attempts = max_attempts.parse().map_err(|_| {
            ConfigError::Invalid(format!("DIALER_MAX_ATTEMPTS is not a number: {}", max_attempts))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = load_config(Some("/nonexistent/dialer.toml")).unwrap();
        assert_eq!(config.server.port, 7860);
        assert_eq!(config.dialout.max_attempts, 5);
        assert_eq!(config.dialout.room_ttl(), Duration::from_secs(7200));
        assert_eq!(config.daily.api_url, dialer_voice::DEFAULT_DAILY_API_URL);
    }

    #[test]
    fn file_values_are_loaded() {
        let file = write_config(
            r#"
            [server]
            port = 9000

            [logging]
            level = "debug"
            json = true

            [daily]
            api_url = "http://127.0.0.1:9999/v1"
            api_key = "secret"

            [dialout]
            max_attempts = 3
            sip_domain = "dev.sip.example.com"
            "#,
        );

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.daily.api_key, "secret");
        assert_eq!(config.dialout.max_attempts().unwrap().get(), 3);
        assert_eq!(config.dialout.sip_domain, "dev.sip.example.com");
    }

    #[test]
    fn zero_max_attempts_fails_startup() {
        let file = write_config("[dialout]\nmax_attempts = 0\n");
        let err = load_config(file.path().to_str()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_file_fails_startup() {
        let file = write_config("[dialout\nmax_attempts = ");
        let err = load_config(file.path().to_str()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let vars: HashMap<&str, &str> = [
            ("DIALER_PORT", "8123"),
            ("DIALER_LOG_JSON", "1"),
            ("DIALER_API_KEY", "from-env"),
            ("DIALER_SIP_DOMAIN", "prod.sip.example.com"),
            ("DIALER_MAX_ATTEMPTS", "7"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.server.port, 8123);
        assert!(config.logging.json);
        assert_eq!(config.daily.api_key, "from-env");
        assert_eq!(config.dialout.sip_domain, "prod.sip.example.com");
        assert_eq!(config.dialout.max_attempts, 7);
    }

    #[test]
    fn unparseable_host_override_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| {
            (k == "DIALER_HOST").then(|| "not-an-ip".to_string())
        })
        .unwrap();
        assert_eq!(config.server.host, default_host());
    }

    #[test]
    fn non_numeric_max_attempts_override_is_rejected() {
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config, |k| {
            (k == "DIALER_MAX_ATTEMPTS").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
