//! Persistent network dataset
//!
//! Line-oriented, `;`-delimited, one network per line:
//!
//! ```text
//! ssid;bssid;rssi;frequency;channel;capabilities;yyyy-MM-dd HH:mm:ss;LEVEL;latitude;longitude
//! ```
//!
//! Rows written before the channel column existed have 9 fields and are
//! still readable. Appends are a keyed set-union, so repeated or concurrent
//! appends of the same networks never produce duplicate lines. `rewrite`
//! replaces the whole file and must not race with appends from another
//! context.

pub mod export;

use crate::error::ScanResult;
use crate::network::{format_timestamp, now_formatted, NetworkKey, NetworkRecord, SecurityLevel, TIMESTAMP_FORMAT};
use chrono::{Local, NaiveDateTime, TimeZone};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Field delimiter
pub const DELIMITER: char = ';';

/// Default dataset file name
pub const DEFAULT_STORE_FILE: &str = "wifis_dataset.csv";

const LEGACY_FIELD_COUNT: usize = 9;
const FIELD_COUNT: usize = 10;

/// Sentinel RSSI for unparsable values
pub const INVALID_RSSI: i32 = -100;
/// Sentinel frequency for unparsable values
pub const INVALID_FREQUENCY: i32 = 0;
/// Sentinel channel for unparsable or missing values
pub const INVALID_CHANNEL: i32 = -1;

/// Format one dataset line (without trailing newline)
pub fn format_line(record: &NetworkRecord, timestamp_formatted: &str) -> String {
    format!(
        "{ssid};{bssid};{rssi};{freq};{channel};{caps};{time};{label};{lat};{lon}",
        ssid = record.ssid,
        bssid = record.bssid,
        rssi = record.rssi,
        freq = record.frequency,
        channel = record.channel,
        caps = record.capabilities,
        time = timestamp_formatted,
        label = record.label,
        lat = record.latitude,
        lon = record.longitude,
    )
}

/// Parse one dataset line. Short lines yield `None`; bad values fall back to
/// sentinels instead of failing.
pub fn parse_line(line: &str) -> Option<NetworkRecord> {
    let parts: Vec<&str> = line.split(DELIMITER).collect();
    if parts.len() < LEGACY_FIELD_COUNT {
        return None;
    }

    // Legacy rows have no channel column
    let (channel, rest) = if parts.len() >= FIELD_COUNT {
        (parts[4].trim().parse().unwrap_or(INVALID_CHANNEL), &parts[5..])
    } else {
        (INVALID_CHANNEL, &parts[4..])
    };

    let (timestamp, timestamp_formatted) = parse_timestamp(rest[1]);

    Some(NetworkRecord {
        ssid: parts[0].to_string(),
        bssid: parts[1].to_string(),
        rssi: parts[2].trim().parse().unwrap_or(INVALID_RSSI),
        frequency: parts[3].trim().parse().unwrap_or(INVALID_FREQUENCY),
        capabilities: rest[0].to_string(),
        timestamp,
        label: SecurityLevel::from_label(rest[2].trim()),
        timestamp_formatted,
        latitude: rest[3].trim().parse().unwrap_or(0.0),
        longitude: rest[4].trim().parse().unwrap_or(0.0),
        channel,
        center_freq0: 0,
        center_freq1: 0,
        operator_friendly_name: String::new(),
        venue_name: String::new(),
        is_passpoint_network: false,
        is_80211mc_responder: false,
    })
}

/// Millisecond timestamp and display string; unparsable dates become "now"
fn parse_timestamp(raw: &str) -> (i64, String) {
    let parsed = NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest());

    match parsed {
        Some(at) => (at.timestamp_millis(), format_timestamp(at)),
        None => {
            let now = Local::now();
            (now.timestamp_millis(), format_timestamp(now))
        }
    }
}

/// Display timestamp for a record being rewritten
fn stored_timestamp(record: &NetworkRecord) -> String {
    if !record.timestamp_formatted.is_empty() {
        return record.timestamp_formatted.clone();
    }
    Local
        .timestamp_millis_opt(record.timestamp)
        .single()
        .map(format_timestamp)
        .unwrap_or_else(now_formatted)
}

/// Append-only network dataset on disk
#[derive(Debug, Clone)]
pub struct NetworkStore {
    path: PathBuf,
}

impl NetworkStore {
    /// Open (or lazily create) the dataset at `path`
    pub fn new(path: impl Into<PathBuf>) -> ScanResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every parseable record, in file order
    pub fn read_all(&self) -> ScanResult<Vec<NetworkRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path)?;
        let content = String::from_utf8_lossy(&bytes);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {} malformed lines in {}", skipped, self.path.display());
        }
        Ok(records)
    }

    /// Keys of every stored record
    pub fn known_keys(&self) -> ScanResult<HashSet<NetworkKey>> {
        Ok(self.read_all()?.iter().map(NetworkRecord::key).collect())
    }

    /// Append records whose key is not stored yet, stamped with the current
    /// time. Returns how many lines were written.
    pub fn append(&self, records: &[NetworkRecord]) -> ScanResult<usize> {
        let mut known = self.known_keys()?;
        let formatted = now_formatted();
        let mut buffer = String::new();
        let mut written = 0usize;

        for record in records {
            // insert() is false for stored keys and for repeats within this batch
            if known.insert(record.key()) {
                buffer.push_str(&format_line(record, &formatted));
                buffer.push('\n');
                written += 1;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        if written > 0 {
            file.write_all(buffer.as_bytes())?;
            file.flush()?;
            info!("Appended {} new networks to {}", written, self.path.display());
        } else {
            debug!("No new networks to append");
        }
        Ok(written)
    }

    /// Replace the whole dataset with `records`
    pub fn rewrite(&self, records: &[NetworkRecord]) -> ScanResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut temp = NamedTempFile::new_in(dir)?;
        for record in records {
            writeln!(temp, "{}", format_line(record, &stored_timestamp(record)))?;
        }
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        info!("Rewrote {} with {} networks", self.path.display(), records.len());
        Ok(())
    }

    /// Remove every stored line with `key`. Returns whether anything was removed.
    pub fn delete(&self, key: &NetworkKey) -> ScanResult<bool> {
        let records = self.read_all()?;
        let before = records.len();
        let kept: Vec<NetworkRecord> = records.into_iter().filter(|r| &r.key() != key).collect();

        if kept.len() == before {
            return Ok(false);
        }
        self.rewrite(&kept)?;
        Ok(true)
    }

    /// Empty the dataset
    pub fn clear(&self) -> ScanResult<()> {
        if self.path.exists() {
            fs::write(&self.path, b"")?;
            info!("Cleared {}", self.path.display());
        }
        Ok(())
    }
}
