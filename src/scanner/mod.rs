//! Scan pipeline: acquisition seams, merging, diffing and cycle orchestration

pub mod detector;
pub mod merger;
pub mod orchestrator;
pub mod source;

pub use detector::NewNetworkDetector;
pub use merger::{MergeKey, MergedBatch, ScanMerger, DEFAULT_RSSI_HYSTERESIS};
pub use orchestrator::{CyclePhase, CycleReport, ScanCycleOrchestrator};
pub use source::{FixedLocation, LocationProvider, ReplayScanSource, ScanSource};
