//! Configuration file parsing and structures.
//!
//! espswitch uses a single TOML file describing one accessory, the logging
//! setup, and the optional local HTTP API.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

/// Lowest poll interval the accessory will accept.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

/// Poll interval used when the configuration does not name one.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// Lowest device request timeout the accessory will accept.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(100);

/// Device request timeout used when the configuration does not name one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub accessory: AccessoryConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `reqwest = "warn"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Build the subscriber filter: the default level plus one directive per override.
    pub fn filter(&self) -> Targets {
        Targets::new().with_default(self.level).with_targets(
            self.overrides
                .iter()
                .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
        )
    }
}

/// The relay device being bridged.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessoryConfig {
    /// Display name exposed to controllers
    pub name: String,

    /// `host` or `host:port` of the device, without scheme or path
    pub host: String,

    /// Poll interval in milliseconds, raised to at least [`MIN_UPDATE_INTERVAL`]
    #[serde(default, alias = "updateInterval")]
    pub update_interval: Option<u64>,

    /// Per-request timeout in milliseconds, raised to at least [`MIN_REQUEST_TIMEOUT`]
    #[serde(default, alias = "requestTimeout")]
    pub request_timeout: Option<u64>,
}

impl AccessoryConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            update_interval: None,
            request_timeout: None,
        }
    }

    /// The poll interval actually used, never below the floor.
    pub fn effective_update_interval(&self) -> Duration {
        self.update_interval
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_UPDATE_INTERVAL)
            .max(MIN_UPDATE_INTERVAL)
    }

    /// The device request timeout actually used, never below the floor.
    pub fn effective_request_timeout(&self) -> Duration {
        self.request_timeout
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
            .max(MIN_REQUEST_TIMEOUT)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "accessory.name",
                message: "must not be empty".to_string(),
            });
        }

        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::Invalid {
                field: "accessory.host",
                message: "must not be empty".to_string(),
            });
        }
        if host.contains("://") || host.contains('/') {
            return Err(ConfigError::Invalid {
                field: "accessory.host",
                message: format!("expected host[:port], got {:?}", self.host),
            });
        }

        Ok(())
    }
}

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8565
}

/// Local HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        contents.parse()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.accessory.validate()?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}
