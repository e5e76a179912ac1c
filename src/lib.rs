//! airsentry - passive Wi-Fi access point auditing
//!
//! Observes nearby access points, labels each one SAFE, MEDIUM or DANGEROUS,
//! folds repeated sightings into one record per network and keeps an
//! append-only dataset of every network ever seen.

pub mod classifier;
pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;
pub mod settings;
pub mod store;

// Re-export commonly used types
pub use classifier::{FeatureExtractor, FeatureVector, PublicNetworkMatcher, Scorer, SecurityClassifier};
pub use config::SentryConfig;
pub use error::{CycleOutcome, ScanError, ScanResult};
pub use network::{Location, NetworkKey, NetworkRecord, RadioScanSample, SecurityLevel};
pub use scanner::{NewNetworkDetector, ScanCycleOrchestrator, ScanMerger};
pub use settings::{Settings, SettingsStore};
pub use store::NetworkStore;

pub type Result<T> = std::result::Result<T, ScanError>;
