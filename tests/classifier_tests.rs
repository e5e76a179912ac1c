//! Classification against the packaged model and pattern list

use airsentry::{
    classifier::{FeatureExtractor, LinearScorer, PublicNetworkMatcher, Scorer, SecurityClassifier},
    network::{RadioScanSample, SecurityLevel},
};
use std::sync::Arc;

const MODEL: &str = "assets/wifi_classifier.json";
const PATTERNS: &str = "assets/public_wifi_patterns.txt";

fn pipeline() -> (FeatureExtractor, SecurityClassifier) {
    let matcher = Arc::new(PublicNetworkMatcher::from_file(PATTERNS).expect("Failed to load patterns"));
    let classifier = SecurityClassifier::from_model_path(MODEL);
    classifier.initialize().expect("Failed to load model");
    (FeatureExtractor::new(matcher), classifier)
}

fn classify(ssid: &str, rssi: i32, frequency: i32, caps: &str) -> SecurityLevel {
    let (extractor, classifier) = pipeline();
    let sample = RadioScanSample::new(ssid, "AA:BB:CC:DD:EE:FF", rssi)
        .with_frequency(frequency)
        .with_capabilities(caps);
    classifier.classify(&extractor.extract(&sample))
}

#[test]
fn test_packaged_model_loads() {
    let scorer = LinearScorer::load(MODEL).expect("Failed to load model");
    assert_eq!(scorer.name(), "wifi-security-dense-v1");
}

#[test]
fn test_open_network_is_dangerous() {
    assert_eq!(classify("Airport Free WiFi", -65, 2437, "[ESS]"), SecurityLevel::Dangerous);
}

#[test]
fn test_wep_network_is_dangerous() {
    assert_eq!(classify("OldRouter", -70, 2462, "[WEP][ESS]"), SecurityLevel::Dangerous);
}

#[test]
fn test_wpa3_network_is_safe() {
    assert_eq!(classify("Apartment", -55, 5180, "[RSN-SAE-CCMP][ESS]"), SecurityLevel::Safe);
}

#[test]
fn test_wpa2_ccmp_network_is_safe() {
    assert_eq!(classify("HomeNet", -50, 5180, "[WPA2-PSK-CCMP][RSN-PSK-CCMP][ESS]"), SecurityLevel::Safe);
}

#[test]
fn test_tkip_with_wps_is_medium() {
    assert_eq!(classify("Office", -72, 2412, "[WPA-PSK-TKIP][ESS][WPS]"), SecurityLevel::Medium);
}

#[test]
fn test_packaged_patterns_flag_public_names() {
    let matcher = PublicNetworkMatcher::from_file(PATTERNS).unwrap();
    assert!(matcher.is_public("eduroam"));
    assert!(matcher.is_public("Cafe Free WiFi"));
    assert!(matcher.is_public("CITYWIFI-Downtown"));
    assert!(!matcher.is_public("HomeNet"));
}
