//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - Builder methods on [`FayeClientBuilder`](crate::client::FayeClientBuilder)

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{FayeError, Result};
use crate::protocol::{DEFAULT_RETRY_INTERVAL_SECS, DEFAULT_TIMEOUT_ADVICE_MS};

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Faye server URL (e.g. ws://localhost:5222/faye)
    pub url: String,

    /// Extra HTTP headers sent with the WebSocket upgrade request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Timeout advice (milliseconds) carried in every /meta/connect request
    pub timeout_advice_ms: u64,

    /// Period of the pending-subscription retry timer in seconds
    pub retry_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            headers: HashMap::new(),
            timeout_advice_ms: DEFAULT_TIMEOUT_ADVICE_MS,
            retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given server URL with defaults
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| FayeError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| FayeError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("FAYE_URL") {
            config.url = url;
        }
        if let Ok(val) = std::env::var("FAYE_TIMEOUT_ADVICE_MS") {
            if let Ok(val) = val.parse() {
                config.timeout_advice_ms = val;
            }
        }
        if let Ok(val) = std::env::var("FAYE_RETRY_INTERVAL_SECS") {
            if let Ok(val) = val.parse() {
                config.retry_interval_secs = val;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.url.is_empty());
        assert_eq!(config.timeout_advice_ms, 10_000);
        assert_eq!(config.retry_interval_secs, 45);
    }

    #[test]
    fn test_config_new() {
        let config = ClientConfig::new("ws://localhost:5222/faye");
        assert_eq!(config.url, "ws://localhost:5222/faye");
        assert_eq!(config.retry_interval_secs, 45);
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            url = "wss://push.example.com/faye"
            timeout_advice_ms = 30000
            retry_interval_secs = 20

            [headers]
            Authorization = "Bearer abc"
        "#;

        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.url, "wss://push.example.com/faye");
        assert_eq!(config.timeout_advice_ms, 30_000);
        assert_eq!(config.retry_interval_secs, 20);
        assert_eq!(
            config.headers.get("Authorization").map(String::as_str),
            Some("Bearer abc")
        );
    }

    #[test]
    fn test_config_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "url = \"ws://127.0.0.1:5222/faye\"\ntimeout_advice_ms = 5000\nretry_interval_secs = 45"
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.url, "ws://127.0.0.1:5222/faye");
        assert_eq!(config.timeout_advice_ms, 5000);
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = ClientConfig::from_file("/nonexistent/faye.toml");
        assert!(matches!(result, Err(FayeError::Config(_))));
    }
}
