//! Configuration module for airsentry

use crate::error::{ScanError, ScanResult};
use crate::scanner::merger::{MergeKey, DEFAULT_RSSI_HYSTERESIS};
use crate::store::DEFAULT_STORE_FILE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentryConfig {
    /// Directory holding the dataset and settings
    pub data_dir: PathBuf,

    /// Dataset file name inside `data_dir`
    pub store_file: String,

    /// Public network pattern list
    pub patterns_path: PathBuf,

    /// Packaged classification model
    pub model_path: PathBuf,

    /// Toggle file name inside `data_dir`
    pub settings_file: String,

    /// Pause between foreground cycles in milliseconds
    pub scan_interval: u64,

    /// Upper bound on waiting for a location fix in milliseconds
    pub location_timeout: u64,

    /// Wait between starting a sweep and reading its results, in milliseconds
    pub scan_settle: u64,

    /// RSSI improvement required before a same-cycle reading is replaced
    pub rssi_hysteresis: i32,

    /// Grouping used by the merger
    pub merge_key: MergeKey,
}

impl Default for SentryConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".airsentry");

        Self {
            data_dir,
            store_file: DEFAULT_STORE_FILE.to_string(),
            patterns_path: PathBuf::from("assets/public_wifi_patterns.txt"),
            model_path: PathBuf::from("assets/wifi_classifier.json"),
            settings_file: "settings.toml".to_string(),
            scan_interval: 2000,
            location_timeout: 5000,
            scan_settle: 1000,
            rssi_hysteresis: DEFAULT_RSSI_HYSTERESIS,
            merge_key: MergeKey::default(),
        }
    }
}

impl SentryConfig {
    /// Set the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the model asset
    pub fn with_model_path(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.model_path = model_path.into();
        self
    }

    /// Set the pattern list asset
    pub fn with_patterns_path(mut self, patterns_path: impl Into<PathBuf>) -> Self {
        self.patterns_path = patterns_path.into();
        self
    }

    /// Set the foreground interval in milliseconds
    pub fn with_scan_interval(mut self, scan_interval: u64) -> Self {
        self.scan_interval = scan_interval;
        self
    }

    /// Set the location timeout in milliseconds
    pub fn with_location_timeout(mut self, location_timeout: u64) -> Self {
        self.location_timeout = location_timeout;
        self
    }

    /// Set the settle delay in milliseconds
    pub fn with_scan_settle(mut self, scan_settle: u64) -> Self {
        self.scan_settle = scan_settle;
        self
    }

    pub fn with_merge_key(mut self, merge_key: MergeKey) -> Self {
        self.merge_key = merge_key;
        self
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(&self.settings_file)
    }

    pub fn scan_interval_duration(&self) -> Duration {
        Duration::from_millis(self.scan_interval)
    }

    pub fn location_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.location_timeout)
    }

    pub fn scan_settle_duration(&self) -> Duration {
        Duration::from_millis(self.scan_settle)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ScanResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ScanError::ConfigError(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;
        let config: SentryConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `~/.airsentry.toml` if present, defaults otherwise
    pub fn load_default_config() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_path = home_dir.join(".airsentry.toml");

        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ScanResult<()> {
        if self.store_file.trim().is_empty() {
            return Err(ScanError::ConfigError("store_file cannot be empty".to_string()));
        }
        if self.settings_file.trim().is_empty() {
            return Err(ScanError::ConfigError("settings_file cannot be empty".to_string()));
        }
        if self.scan_interval == 0 {
            return Err(ScanError::ConfigError("scan_interval must be greater than 0".to_string()));
        }
        if self.location_timeout == 0 {
            return Err(ScanError::ConfigError("location_timeout must be greater than 0".to_string()));
        }
        if self.rssi_hysteresis < 0 {
            return Err(ScanError::ConfigError("rssi_hysteresis cannot be negative".to_string()));
        }
        Ok(())
    }
}
