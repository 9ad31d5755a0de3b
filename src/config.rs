//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `client.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ApiConfig: Where the battery service lives and how long to wait.
//!     - StorageConfig: The key-value file holding the session token.
//!     - SensorConfig: Which battery source to read.
//!     - LoggingConfig: Default tracing filter.
//!
//! ==============================================================================

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::sensor::{BatterySensor, FixedBattery, SysfsBattery};

/// overrides `api.base_url` when set
pub const API_URL_ENV: &str = "BATTERY_API_URL";

pub const DEFAULT_BASE_URL: &str = "https://back-dev-8z4a.onrender.com";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub sensor: SensorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data").join("store.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SensorSource {
    #[default]
    Sysfs,
    Fixed,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorConfig {
    pub source: SensorSource,
    /// explicit power-supply directory; scanned for when absent
    pub device: Option<PathBuf>,
    pub fixed_fraction: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            source: SensorSource::Sysfs,
            device: None,
            fixed_fraction: 1.0,
        }
    }
}

impl SensorConfig {
    pub fn build(&self) -> Arc<dyn BatterySensor> {
        match (self.source, &self.device) {
            (SensorSource::Fixed, _) => Arc::new(FixedBattery::new(self.fixed_fraction)),
            (SensorSource::Sysfs, Some(device)) => Arc::new(SysfsBattery::with_device(device)),
            (SensorSource::Sysfs, None) => Arc::new(SysfsBattery::new()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// first config file found in the usual places, if any
    pub fn find_default() -> Option<PathBuf> {
        [
            PathBuf::from("config").join("client.toml"),
            PathBuf::from("..").join("config").join("client.toml"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load from `path`, or from the default locations, or fall back to defaults
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        match path.map(Path::to_path_buf).or_else(Self::find_default) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// apply `BATTERY_API_URL` on top of the file values
    pub fn with_env_overrides(self) -> Self {
        self.with_api_url(std::env::var(API_URL_ENV).ok())
    }

    fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        self
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│         CLIENT CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ API: {}", self.api.base_url);
        println!("│ Timeout: {}s", self.api.timeout_seconds);
        println!("│ Store: {}", self.storage.path.display());
        println!("│ Sensor: {:?}", self.sensor.source);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
