//! Collaborator traits for scan acquisition and location fixes
//!
//! Radio access is owned by the platform. The pipeline only sees these two
//! traits; the replay source and fixed location provider shipped here feed
//! recorded data through the same seams.

use crate::error::{ScanError, ScanResult};
use crate::network::{Location, RadioScanSample};
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Platform Wi-Fi scanner
#[async_trait]
pub trait ScanSource: Send + Sync {
    /// Scanner name for logs
    fn name(&self) -> &str;

    /// Location/scan permissions are granted
    fn permission_granted(&self) -> bool {
        true
    }

    /// Radio is switched on
    fn radio_enabled(&self) -> bool {
        true
    }

    /// Ask the platform to start a sweep
    async fn start_scan(&self) -> ScanResult<()>;

    /// Latest results; `None` when the platform has nothing to report
    async fn scan_results(&self) -> ScanResult<Option<Vec<RadioScanSample>>>;
}

/// Platform location service
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current fix, `None` when unavailable. May block for a while.
    async fn current_location(&self) -> Option<Location>;
}

/// Always reports the same fix (or none)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Location>);

impl FixedLocation {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self(Some(Location::new(latitude, longitude)))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Option<Location> {
        self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayFile {
    Batches(Vec<Vec<RadioScanSample>>),
    Single(Vec<RadioScanSample>),
}

/// Replays recorded scan batches, one per sweep, wrapping around at the end
#[derive(Debug)]
pub struct ReplayScanSource {
    batches: Vec<Vec<RadioScanSample>>,
    cursor: AtomicUsize,
}

impl ReplayScanSource {
    pub fn new(batches: Vec<Vec<RadioScanSample>>) -> Self {
        Self {
            batches,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Load from a JSON file holding either one batch or a list of batches
    pub fn from_file<P: AsRef<Path>>(path: P) -> ScanResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let batches = match serde_json::from_str::<ReplayFile>(&content)? {
            ReplayFile::Batches(batches) => batches,
            ReplayFile::Single(batch) => vec![batch],
        };
        info!(
            "Loaded {} recorded scan batches from {}",
            batches.len(),
            path.as_ref().display()
        );
        Ok(Self::new(batches))
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

#[async_trait]
impl ScanSource for ReplayScanSource {
    fn name(&self) -> &str {
        "replay"
    }

    async fn start_scan(&self) -> ScanResult<()> {
        if self.batches.is_empty() {
            return Err(ScanError::ScanStartFailed("no recorded batches".to_string()));
        }
        Ok(())
    }

    async fn scan_results(&self) -> ScanResult<Option<Vec<RadioScanSample>>> {
        if self.batches.is_empty() {
            return Ok(None);
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.batches.len();
        debug!("Replaying batch {} ({} samples)", i, self.batches[i].len());
        Ok(Some(self.batches[i].clone()))
    }
}
