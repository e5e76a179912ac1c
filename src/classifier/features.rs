//! Feature extraction for the security classifier
//!
//! The slot order below is the model's input contract. Changing it requires a
//! retrained model.

use super::public_networks::PublicNetworkMatcher;
use crate::network::RadioScanSample;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of model inputs
pub const FEATURE_COUNT: usize = 10;

/// Feature names in the exact order they appear in the vector
pub const FEATURE_LAYOUT: [&str; FEATURE_COUNT] = [
    "is_open",        // 0
    "uses_wep",       // 1
    "uses_tkip",      // 2
    "uses_wpa2_ccmp", // 3
    "uses_wpa3",      // 4
    "wps_enabled",    // 5
    "signal_class",   // 6: 0 strong, 1 medium, 2 weak
    "is_5ghz",        // 7
    "is_hidden_like", // 8
    "is_public",      // 9
];

/// Fixed-length model input, every value in {0.0, 1.0, 2.0}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Lookup by layout name
    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        FEATURE_LAYOUT
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.get(i))
    }
}

/// Signal class: 0 if rssi >= -60, 2 if rssi <= -80, otherwise 1
pub fn signal_class(rssi: i32) -> f32 {
    if rssi >= -60 {
        0.0
    } else if rssi <= -80 {
        2.0
    } else {
        1.0
    }
}

/// Names ending in 4 hex digits look machine generated (e.g. "Router-3FA2")
pub fn is_hidden_like(ssid: &str) -> bool {
    let tail: Vec<char> = ssid.chars().rev().take(4).collect();
    tail.len() == 4 && tail.iter().all(|c| c.is_ascii_hexdigit())
}

fn flag(set: bool) -> f32 {
    if set {
        1.0
    } else {
        0.0
    }
}

/// Compute the feature vector for a sample given the public-network verdict
pub fn extract_features(sample: &RadioScanSample, is_public: bool) -> FeatureVector {
    let caps = sample.capabilities.to_lowercase();

    FeatureVector::from_values([
        flag(caps.contains("ess") && !(caps.contains("wpa") || caps.contains("rsn"))),
        flag(caps.contains("wep")),
        flag(caps.contains("tkip")),
        flag(caps.contains("wpa2") && caps.contains("ccmp")),
        flag(caps.contains("sae")),
        flag(caps.contains("wps")),
        signal_class(sample.rssi),
        flag(sample.frequency > 4000),
        flag(is_hidden_like(&sample.ssid)),
        flag(is_public),
    ])
}

/// Turns scan samples into model input, consulting the public-name matcher
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    matcher: Arc<PublicNetworkMatcher>,
}

impl FeatureExtractor {
    pub fn new(matcher: Arc<PublicNetworkMatcher>) -> Self {
        Self { matcher }
    }

    pub fn extract(&self, sample: &RadioScanSample) -> FeatureVector {
        extract_features(sample, self.matcher.is_public(&sample.ssid))
    }

    pub fn matcher(&self) -> &PublicNetworkMatcher {
        &self.matcher
    }
}
