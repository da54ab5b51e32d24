//! Configuration management for the ledger client.

use crate::{CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default ledger API base URL (can be overridden at compile time via
/// LEDGER_API_BASE_URL env var).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("LEDGER_API_BASE_URL") {
    Some(url) => url,
    None => "https://ledger-webapp.onrender.com/api/v1",
};

/// Default event feed URL (can be overridden at compile time via
/// LEDGER_FEED_URL env var).
pub const DEFAULT_FEED_URL: &str = match option_env!("LEDGER_FEED_URL") {
    Some(url) => url,
    None => "wss://ledger-webapp.onrender.com/api/v1/ws",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default REST request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Ledger REST API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Event feed WebSocket URL.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// REST request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    /// Environment variables override values from the file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("LEDGER_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(url) = std::env::var("LEDGER_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(url) = std::env::var("LEDGER_FEED_URL") {
            self.feed_url = url;
        }
        if let Ok(timeout) = std::env::var("LEDGER_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.request_timeout_secs = secs;
            }
        }
    }
}
