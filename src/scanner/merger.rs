//! Same-cycle deduplication with signal-strength hysteresis
//!
//! Consecutive sweeps within one polling window report the same access point
//! several times with a few dB of jitter. A later reading only replaces the
//! current one when it is stronger by more than the threshold.

use crate::network::{dataset_safe, Location, NetworkKey, NetworkRecord, RadioScanSample, SecurityLevel};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum RSSI improvement (exclusive) before a reading is replaced
pub const DEFAULT_RSSI_HYSTERESIS: i32 = 5;

/// How samples are grouped into one logical network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKey {
    /// (identifier, hardware address)
    IdentifierAndAddress,
    /// Identifier only; distinct radios sharing a name collapse into one record
    Identifier,
}

impl Default for MergeKey {
    fn default() -> Self {
        MergeKey::IdentifierAndAddress
    }
}

impl MergeKey {
    fn key_for(&self, sample: &RadioScanSample) -> NetworkKey {
        match self {
            MergeKey::IdentifierAndAddress => sample.key(),
            MergeKey::Identifier => NetworkKey::new(dataset_safe(&sample.ssid), ""),
        }
    }
}

/// One record per logical network, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct MergedBatch {
    records: Vec<NetworkRecord>,
    index: HashMap<NetworkKey, usize>,
}

impl MergedBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[NetworkRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<NetworkRecord> {
        self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkRecord> {
        self.records.iter()
    }

    /// Look up by merge key (for `MergeKey::Identifier` pass an empty address)
    pub fn get(&self, key: &NetworkKey) -> Option<&NetworkRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// First record carrying this identifier
    pub fn get_by_ssid(&self, ssid: &str) -> Option<&NetworkRecord> {
        self.records.iter().find(|r| r.ssid == ssid)
    }
}

/// Folds a cycle's raw samples into [`MergedBatch`]
#[derive(Debug, Clone)]
pub struct ScanMerger {
    threshold: i32,
    merge_key: MergeKey,
}

impl Default for ScanMerger {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_RSSI_HYSTERESIS,
            merge_key: MergeKey::default(),
        }
    }
}

impl ScanMerger {
    pub fn new(threshold: i32, merge_key: MergeKey) -> Self {
        Self { threshold, merge_key }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn merge_key(&self) -> MergeKey {
        self.merge_key
    }

    /// True when `candidate` should replace a record holding `current` dBm
    pub fn should_replace(&self, current: i32, candidate: i32) -> bool {
        (i64::from(current) - i64::from(candidate)).abs() > i64::from(self.threshold) && candidate > current
    }

    /// Merge samples in order. `classify` runs only for samples that end up
    /// recorded, whether first sighting or replacement.
    pub fn merge<F>(
        &self,
        samples: &[RadioScanSample],
        location: Location,
        timestamp_formatted: &str,
        mut classify: F,
    ) -> MergedBatch
    where
        F: FnMut(&RadioScanSample) -> SecurityLevel,
    {
        let mut batch = MergedBatch::default();
        let mut skipped_blank = 0usize;
        let mut redundant = 0usize;

        for sample in samples {
            if sample.is_blank() {
                skipped_blank += 1;
                continue;
            }

            let key = self.merge_key.key_for(sample);
            match batch.index.get(&key).copied() {
                None => {
                    let record = NetworkRecord::from_sample(
                        sample,
                        classify(sample),
                        location,
                        timestamp_formatted.to_string(),
                    );
                    batch.index.insert(key, batch.records.len());
                    batch.records.push(record);
                }
                Some(i) => {
                    if self.should_replace(batch.records[i].rssi, sample.rssi) {
                        debug!(
                            "Replacing {} reading {} dBm with {} dBm",
                            sample.ssid, batch.records[i].rssi, sample.rssi
                        );
                        batch.records[i] = NetworkRecord::from_sample(
                            sample,
                            classify(sample),
                            location,
                            timestamp_formatted.to_string(),
                        );
                    } else {
                        redundant += 1;
                    }
                }
            }
        }

        debug!(
            "Merged {} samples into {} networks ({} blank, {} redundant)",
            samples.len(),
            batch.len(),
            skipped_blank,
            redundant
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(merger: &ScanMerger, samples: &[RadioScanSample]) -> MergedBatch {
        merger.merge(samples, Location::default(), "2024-05-01 12:00:00", |_| SecurityLevel::Safe)
    }

    #[test]
    fn test_small_difference_keeps_first() {
        let merger = ScanMerger::default();
        let batch = merge(
            &merger,
            &[
                RadioScanSample::new("Home", "AA:BB", -80).with_timestamp(1),
                RadioScanSample::new("Home", "AA:BB", -83).with_timestamp(2),
            ],
        );
        assert_eq!(batch.len(), 1);
        let record = batch.get_by_ssid("Home").unwrap();
        assert_eq!(record.rssi, -80);
        assert_eq!(record.timestamp, 1);
    }

    #[test]
    fn test_much_stronger_replaces() {
        let merger = ScanMerger::default();
        let batch = merge(
            &merger,
            &[
                RadioScanSample::new("Home", "AA:BB", -80),
                RadioScanSample::new("Home", "AA:BB", -60),
            ],
        );
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.get_by_ssid("Home").unwrap().rssi, -60);
    }

    #[test]
    fn test_much_weaker_is_ignored() {
        let merger = ScanMerger::default();
        let batch = merge(
            &merger,
            &[
                RadioScanSample::new("Home", "AA:BB", -50),
                RadioScanSample::new("Home", "AA:BB", -90),
            ],
        );
        assert_eq!(batch.get_by_ssid("Home").unwrap().rssi, -50);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let merger = ScanMerger::default();
        assert!(!merger.should_replace(-80, -75));
        assert!(merger.should_replace(-80, -74));
    }

    #[test]
    fn test_extreme_readings_do_not_overflow() {
        let merger = ScanMerger::default();
        assert!(merger.should_replace(-100, i32::MAX));
        assert!(!merger.should_replace(i32::MAX, i32::MIN));
        assert!(merger.should_replace(i32::MIN, i32::MAX));

        let batch = merge(
            &merger,
            &[
                RadioScanSample::new("Home", "AA:BB", -100),
                RadioScanSample::new("Home", "AA:BB", i32::MAX),
            ],
        );
        assert_eq!(batch.get_by_ssid("Home").unwrap().rssi, i32::MAX);
    }

    #[test]
    fn test_blank_identifiers_dropped() {
        let merger = ScanMerger::default();
        let batch = merge(
            &merger,
            &[
                RadioScanSample::new("", "AA:BB", -40),
                RadioScanSample::new("  ", "CC:DD", -40),
                RadioScanSample::new("Cafe", "EE:FF", -60),
            ],
        );
        assert_eq!(batch.len(), 1);
        assert!(batch.iter().all(|r| !r.ssid.trim().is_empty()));
    }

    #[test]
    fn test_classification_only_for_recorded_samples() {
        let merger = ScanMerger::default();
        let samples = [
            RadioScanSample::new("Home", "AA:BB", -80),
            RadioScanSample::new("Home", "AA:BB", -82),
            RadioScanSample::new("Home", "AA:BB", -60),
        ];
        let mut calls = 0;
        let batch = merger.merge(&samples, Location::default(), "", |s| {
            calls += 1;
            if s.rssi == -60 {
                SecurityLevel::Medium
            } else {
                SecurityLevel::Dangerous
            }
        });
        assert_eq!(calls, 2);
        assert_eq!(batch.get_by_ssid("Home").unwrap().label, SecurityLevel::Medium);
    }

    #[test]
    fn test_same_name_different_radios() {
        let samples = [
            RadioScanSample::new("Mesh", "AA:AA", -70),
            RadioScanSample::new("Mesh", "BB:BB", -40),
        ];

        let by_pair = merge(&ScanMerger::default(), &samples);
        assert_eq!(by_pair.len(), 2);
        assert!(by_pair.get(&NetworkKey::new("Mesh", "BB:BB")).is_some());

        let by_name = merge(&ScanMerger::new(DEFAULT_RSSI_HYSTERESIS, MergeKey::Identifier), &samples);
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name.get_by_ssid("Mesh").unwrap().bssid, "BB:BB");
    }

    #[test]
    fn test_location_and_time_stamped() {
        let merger = ScanMerger::default();
        let batch = merger.merge(
            &[RadioScanSample::new("Home", "AA:BB", -50)],
            Location::new(45.0, 7.5),
            "2024-05-01 12:00:00",
            |_| SecurityLevel::Safe,
        );
        let record = &batch.records()[0];
        assert_eq!(record.latitude, 45.0);
        assert_eq!(record.longitude, 7.5);
        assert_eq!(record.timestamp_formatted, "2024-05-01 12:00:00");
    }
}
