//! User-toggled behaviour flags
//!
//! Persisted as TOML and published through a `watch` channel so the
//! foreground loop and any UI can react when a flag flips.

use crate::error::ScanResult;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Snapshot of every flag. All default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auto_scan: bool,
    pub auto_save: bool,
    pub notifications: bool,
    pub vibration: bool,
    pub show_version: bool,
}

/// Named flag, used by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    AutoScan,
    AutoSave,
    Notifications,
    Vibration,
    ShowVersion,
}

impl std::str::FromStr for SettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto_scan" => Ok(SettingKey::AutoScan),
            "auto_save" => Ok(SettingKey::AutoSave),
            "notifications" | "notification" => Ok(SettingKey::Notifications),
            "vibration" => Ok(SettingKey::Vibration),
            "show_version" => Ok(SettingKey::ShowVersion),
            other => Err(format!("unknown setting: {}", other)),
        }
    }
}

impl Settings {
    fn set(&mut self, key: SettingKey, value: bool) {
        match key {
            SettingKey::AutoScan => self.auto_scan = value,
            SettingKey::AutoSave => self.auto_save = value,
            SettingKey::Notifications => self.notifications = value,
            SettingKey::Vibration => self.vibration = value,
            SettingKey::ShowVersion => self.show_version = value,
        }
    }
}

/// Settings persisted on disk, observable in memory
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    tx: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Load from `path`; a missing file means all defaults
    pub fn load(path: impl Into<PathBuf>) -> ScanResult<Self> {
        let path = path.into();
        let settings: Settings = if path.exists() {
            toml::from_str(&fs::read_to_string(&path)?)?
        } else {
            Settings::default()
        };
        let (tx, _) = watch::channel(settings);
        Ok(Self { path: Some(path), tx })
    }

    /// Settings that live only in memory
    pub fn in_memory(settings: Settings) -> Self {
        let (tx, _) = watch::channel(settings);
        Self { path: None, tx }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current snapshot
    pub fn current(&self) -> Settings {
        *self.tx.borrow()
    }

    /// Receiver that sees every later change
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Flip one flag, persist, and notify observers
    pub fn set(&self, key: SettingKey, value: bool) -> ScanResult<()> {
        self.tx.send_modify(|settings| settings.set(key, value));
        debug!("Setting {:?} = {}", key, value);
        self.save()
    }

    pub fn set_auto_scan(&self, value: bool) -> ScanResult<()> {
        self.set(SettingKey::AutoScan, value)
    }

    pub fn set_auto_save(&self, value: bool) -> ScanResult<()> {
        self.set(SettingKey::AutoSave, value)
    }

    pub fn set_notifications(&self, value: bool) -> ScanResult<()> {
        self.set(SettingKey::Notifications, value)
    }

    pub fn set_vibration(&self, value: bool) -> ScanResult<()> {
        self.set(SettingKey::Vibration, value)
    }

    fn save(&self) -> ScanResult<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, toml::to_string_pretty(&self.current())?)?;
        }
        Ok(())
    }
}
