//! Configuration management for waybeacon.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_CAPACITY;
use crate::error::{Error, Result};
use crate::transport::HttpTransport;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "waybeacon";

/// Default store file name.
const STORE_FILE_NAME: &str = "telemetry.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `WAYBEACON_`)
/// 2. TOML config file at `~/.config/waybeacon/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Uplink configuration.
    pub uplink: UplinkConfig,
    /// Buffer configuration.
    pub buffer: BufferConfig,
    /// Service configuration.
    pub service: ServiceConfig,
}

/// Uplink-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    /// Base URL of the collector; the ingestion path is appended to it.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Buffer-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Path to the durable store file.
    /// Defaults to `~/.local/share/waybeacon/telemetry.db`
    pub store_path: Option<PathBuf>,
    /// Maximum number of undelivered samples to retain; oldest are evicted
    /// first once the buffer is full.
    pub capacity: usize,
}

/// Service-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Interval between flush attempts in seconds.
    pub flush_interval_secs: u64,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            // Development placeholder; a real deployment must configure this.
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            store_path: None, // Will be resolved to default at runtime
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `WAYBEACON_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("WAYBEACON_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.buffer.capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "buffer capacity must be at least 1".to_string(),
            });
        }

        if self.uplink.request_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "request_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.service.flush_interval_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "flush_interval_secs must be greater than 0".to_string(),
            });
        }

        // The transport owns the URL rules; reject bad bases at load time.
        HttpTransport::ping_url(&self.uplink.base_url)?;

        Ok(())
    }

    /// Get the store path, resolving defaults if not set.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.buffer
            .store_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(STORE_FILE_NAME))
    }

    /// Get the per-request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.uplink.request_timeout_secs)
    }

    /// Get the flush interval as a Duration.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.service.flush_interval_secs)
    }
}
