//! Wireless network data model
//!
//! Raw scan samples as they come out of the platform scanner, the canonical
//! [`NetworkRecord`] that is merged and persisted, and the [`SecurityLevel`]
//! assigned to each record by the classifier.

use chrono::{DateTime, Local};
use colored::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout used for every human-readable timestamp in the dataset
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a point in time the way the dataset stores it
pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time in dataset format
pub fn now_formatted() -> String {
    format_timestamp(Local::now())
}

/// Replace characters that would break the line-oriented dataset layout
pub fn dataset_safe(value: &str) -> String {
    value.replace([';', '\n', '\r'], " ")
}

/// Map a centre frequency in MHz to its 802.11 channel number, or -1
pub fn frequency_to_channel(frequency: i32) -> i32 {
    match frequency {
        2412..=2484 => (frequency - 2407) / 5,
        5170..=5895 => (frequency - 5000) / 5,
        5955..=7115 => (frequency - 5950) / 5, // 6 GHz
        _ => -1,
    }
}

/// Security classification of an access point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityLevel {
    Safe,
    Medium,
    Dangerous,
}

impl SecurityLevel {
    /// Serialized label as written to the dataset
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityLevel::Safe => "SAFE",
            SecurityLevel::Medium => "MEDIUM",
            SecurityLevel::Dangerous => "DANGEROUS",
        }
    }

    /// Decode a serialized label. Anything unrecognised is DANGEROUS.
    pub fn from_label(label: &str) -> Self {
        match label {
            "SAFE" => SecurityLevel::Safe,
            "MEDIUM" => SecurityLevel::Medium,
            _ => SecurityLevel::Dangerous,
        }
    }

    /// Display and alert color
    pub fn color(&self) -> Color {
        match self {
            SecurityLevel::Safe => Color::Green,
            SecurityLevel::Medium => Color::Yellow,
            SecurityLevel::Dangerous => Color::Red,
        }
    }

    pub fn is_dangerous(&self) -> bool {
        matches!(self, SecurityLevel::Dangerous)
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        SecurityLevel::Dangerous
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for SecurityLevel {
    fn from(label: &str) -> Self {
        SecurityLevel::from_label(label)
    }
}

/// One access point reading from a single scan sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioScanSample {
    pub ssid: String,
    pub bssid: String,
    /// dBm, more negative is weaker
    pub rssi: i32,
    /// MHz
    pub frequency: i32,
    pub capabilities: String,
    /// Raw platform timestamp
    pub timestamp: i64,
    pub channel_width: i32,
    pub center_freq0: i32,
    pub center_freq1: i32,
    pub operator_friendly_name: String,
    pub venue_name: String,
    pub is_passpoint_network: bool,
    pub is_80211mc_responder: bool,
}

impl RadioScanSample {
    pub fn new(ssid: impl Into<String>, bssid: impl Into<String>, rssi: i32) -> Self {
        Self {
            ssid: ssid.into(),
            bssid: bssid.into(),
            rssi,
            ..Default::default()
        }
    }

    pub fn with_frequency(mut self, frequency: i32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_capabilities(mut self, capabilities: impl Into<String>) -> Self {
        self.capabilities = capabilities.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Samples with an empty or whitespace-only name are dropped by the merger
    pub fn is_blank(&self) -> bool {
        self.ssid.trim().is_empty()
    }

    /// Identity key in the form the dataset stores it
    pub fn key(&self) -> NetworkKey {
        NetworkKey::new(dataset_safe(&self.ssid), dataset_safe(&self.bssid))
    }
}

/// Identity of a logical network: (identifier, hardware address)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkKey {
    pub ssid: String,
    pub bssid: String,
}

impl NetworkKey {
    pub fn new(ssid: impl Into<String>, bssid: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            bssid: bssid.into(),
        }
    }
}

impl fmt::Display for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ssid, self.bssid)
    }
}

/// Geographic fix attached to every record of a cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Canonical record of one network, the unit of merge and persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub ssid: String,
    pub bssid: String,
    pub rssi: i32,
    pub frequency: i32,
    pub capabilities: String,
    pub timestamp: i64,
    pub label: SecurityLevel,
    pub timestamp_formatted: String,
    pub latitude: f64,
    pub longitude: f64,
    pub channel: i32,
    pub center_freq0: i32,
    pub center_freq1: i32,
    pub operator_friendly_name: String,
    pub venue_name: String,
    pub is_passpoint_network: bool,
    pub is_80211mc_responder: bool,
}

impl NetworkRecord {
    /// Build a record from a classified sample
    pub fn from_sample(
        sample: &RadioScanSample,
        label: SecurityLevel,
        location: Location,
        timestamp_formatted: String,
    ) -> Self {
        Self {
            ssid: dataset_safe(&sample.ssid),
            bssid: dataset_safe(&sample.bssid),
            rssi: sample.rssi,
            frequency: sample.frequency,
            capabilities: dataset_safe(&sample.capabilities),
            timestamp: sample.timestamp,
            label,
            timestamp_formatted,
            latitude: location.latitude,
            longitude: location.longitude,
            channel: frequency_to_channel(sample.frequency),
            center_freq0: sample.center_freq0,
            center_freq1: sample.center_freq1,
            operator_friendly_name: sample.operator_friendly_name.clone(),
            venue_name: sample.venue_name.clone(),
            is_passpoint_network: sample.is_passpoint_network,
            is_80211mc_responder: sample.is_80211mc_responder,
        }
    }

    pub fn key(&self) -> NetworkKey {
        NetworkKey::new(&self.ssid, &self.bssid)
    }
}
