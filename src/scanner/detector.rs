//! New-network detection against the persisted dataset

use crate::network::{NetworkKey, NetworkRecord};
use std::collections::HashSet;

/// Diffs a merged batch against the store's known keys
#[derive(Debug, Clone, Copy, Default)]
pub struct NewNetworkDetector;

impl NewNetworkDetector {
    /// Records whose (identifier, address) key is not yet known, in batch order
    pub fn detect(&self, batch: &[NetworkRecord], known: &HashSet<NetworkKey>) -> Vec<NetworkRecord> {
        batch
            .iter()
            .filter(|record| !known.contains(&record.key()))
            .cloned()
            .collect()
    }
}
