//! Configuration management for the collector
//!
//! Loads configuration from config.toml at startup.
//! Every section and field has a default, so an empty file is valid.

use crate::udp::socket::multicast_address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Collector configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Socket and request settings
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Statistics sink settings
    #[serde(default)]
    pub sink: SinkConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Socket and request scheduling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectorConfig {
    /// Network interface the multicast group is scoped to
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Seconds between requests; 0 is rejected when the collector starts
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Local address the socket binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Explicit request target, replaces the interface's multicast group
    #[serde(default)]
    pub request_address: Option<String>,
}

/// Statistics sink
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SinkConfig {
    /// Forward statistics to the log sink and run the global stats worker
    #[serde(default)]
    pub enabled: bool,
}

/// Logging output
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory for rolling log files
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// Default filter directive, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write rolling log files in addition to the console
    #[serde(default = "default_files")]
    pub files: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            interval_secs: default_interval_secs(),
            listen_address: default_listen_address(),
            request_address: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            level: default_log_level(),
            files: default_files(),
        }
    }
}

fn default_interface() -> String {
    "bat0".to_string()
}

fn default_interval_secs() -> u64 {
    60
}

fn default_listen_address() -> String {
    "[::]:0".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_files() -> bool {
    true
}

impl CollectorConfig {
    /// Request interval
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Address requests are sent to: the explicit target, or the
    /// interface-scoped multicast group
    pub fn request_address(&self) -> String {
        self.request_address
            .clone()
            .unwrap_or_else(|| multicast_address(&self.interface))
    }
}

impl Config {
    /// Load configuration from the file named by CONFIG_PATH (default config.toml)
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File not found - use defaults
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading file
    IoError(std::io::Error),
    /// Parse error (invalid TOML)
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(_) => None,
        }
    }
}

impl From<ConfigError> for crate::CollectorError {
    fn from(e: ConfigError) -> Self {
        crate::CollectorError::Config(e.to_string())
    }
}
