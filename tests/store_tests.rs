use airsentry::{
    network::{Location, NetworkKey, NetworkRecord, RadioScanSample, SecurityLevel},
    store::{
        export::{export_to_file, ExportFormat},
        NetworkStore, INVALID_RSSI,
    },
};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn record(ssid: &str, bssid: &str, rssi: i32) -> NetworkRecord {
    NetworkRecord::from_sample(
        &RadioScanSample::new(ssid, bssid, rssi)
            .with_frequency(2412)
            .with_capabilities("[WPA2-PSK-CCMP][ESS]"),
        SecurityLevel::Safe,
        Location::new(52.52, 13.405),
        "2024-06-01 08:00:00".to_string(),
    )
}

fn open_store(dir: &TempDir) -> NetworkStore {
    NetworkStore::new(dir.path().join("data").join("wifis_dataset.csv")).expect("Failed to open store")
}

#[test]
fn test_append_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let batch = vec![record("Home", "AA:BB", -50), record("Cafe", "EE:FF", -70)];

    assert_eq!(store.append(&batch).unwrap(), 2);
    let once = fs::read_to_string(store.path()).unwrap();

    assert_eq!(store.append(&batch).unwrap(), 0);
    let twice = fs::read_to_string(store.path()).unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice.lines().count(), 2);
}

#[test]
fn test_duplicate_keys_within_one_batch() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let batch = vec![
        record("Home", "AA:BB", -50),
        record("Home", "AA:BB", -40),
        record("Home", "CC:DD", -60),
    ];

    assert_eq!(store.append(&batch).unwrap(), 2);
    let stored = store.read_all().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].rssi, -50);
}

#[test]
fn test_malformed_rssi_uses_sentinel() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    fs::write(
        store.path(),
        "Home;AA:BB;strong;2412;1;[ESS];2024-06-01 08:00:00;SAFE;1.5;2.5\n\
         too;short\n\
         Cafe;EE:FF;-70;5180;36;[ESS];2024-06-01 08:00:00;MEDIUM;0;0\n",
    )
    .unwrap();

    let records = store.read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].rssi, INVALID_RSSI);
    assert_eq!(records[0].latitude, 1.5);
    assert_eq!(records[1].label, SecurityLevel::Medium);
    assert_eq!(records[1].channel, 36);
}

#[test]
fn test_known_keys_reflect_store() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    assert!(store.known_keys().unwrap().is_empty());

    store.append(&[record("Home", "AA:BB", -50)]).unwrap();
    let keys = store.known_keys().unwrap();
    assert!(keys.contains(&NetworkKey::new("Home", "AA:BB")));
    assert!(!keys.contains(&NetworkKey::new("Home", "CC:DD")));
}

#[test]
fn test_delete_then_reappend() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store
        .append(&[record("Home", "AA:BB", -50), record("Cafe", "EE:FF", -70)])
        .unwrap();

    assert!(store.delete(&NetworkKey::new("Home", "AA:BB")).unwrap());
    assert!(!store.delete(&NetworkKey::new("Home", "AA:BB")).unwrap());
    assert_eq!(store.read_all().unwrap().len(), 1);

    // A deleted key is new again
    assert_eq!(store.append(&[record("Home", "AA:BB", -50)]).unwrap(), 1);
    assert_eq!(store.read_all().unwrap().len(), 2);
}

#[test]
fn test_clear_empties_dataset() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.append(&[record("Home", "AA:BB", -50)]).unwrap();
    store.clear().unwrap();
    assert!(store.read_all().unwrap().is_empty());
    assert!(store.known_keys().unwrap().is_empty());
}

#[test]
fn test_export_from_store() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.append(&[record("Home", "AA:BB", -50)]).unwrap();
    let records = store.read_all().unwrap();

    let csv_path = dir.path().join("export.csv");
    export_to_file(&csv_path, &records, ExportFormat::Csv).unwrap();
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("SSID;BSSID;RSSI;Frequency;Capabilities;Timestamp;SecurityLevel;Latitude;Longitude"));
    assert!(csv.contains("Home;AA:BB;-50;2412;"));

    let json_path = dir.path().join("export.json");
    export_to_file(&json_path, &records, ExportFormat::Json).unwrap();
    let parsed: Vec<NetworkRecord> = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].ssid, "Home");
}

proptest! {
    #[test]
    fn prop_one_line_per_key(keys in prop::collection::vec((0u8..4, 0u8..3), 0..20)) {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let batch: Vec<NetworkRecord> = keys
            .iter()
            .map(|(s, b)| record(&format!("net{}", s), &format!("00:0{}", b), -50))
            .collect();

        store.append(&batch).unwrap();
        store.append(&batch).unwrap();

        let unique: std::collections::HashSet<_> = batch.iter().map(NetworkRecord::key).collect();
        prop_assert_eq!(store.read_all().unwrap().len(), unique.len());
    }
}
