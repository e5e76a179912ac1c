//! Error handling for the airsentry pipeline
//!
//! Every failure the scan pipeline can hit is expressed as a [`ScanError`].
//! Boundaries convert these into recoverable outcomes: defaults for malformed
//! data, DANGEROUS for inference failures, and [`CycleOutcome::Retry`] for
//! platform failures reported to the external scheduler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Wi-Fi radio is disabled")]
    RadioDisabled,

    #[error("Scan failed to start: {0}")]
    ScanStartFailed(String),

    #[error("No scan results available")]
    NoResults,

    #[error("Failed to load classification model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Invalid public network pattern list: {0}")]
    PatternLoad(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl ScanError {
    /// Platform conditions that may clear up on their own by the next run
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScanError::PermissionDenied(_)
                | ScanError::RadioDisabled
                | ScanError::ScanStartFailed(_)
                | ScanError::NoResults
                | ScanError::IoError(_)
        )
    }

    /// Short machine-friendly category, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::PermissionDenied(_) => "permission",
            ScanError::RadioDisabled => "radio_disabled",
            ScanError::ScanStartFailed(_) => "scan_start",
            ScanError::NoResults => "no_results",
            ScanError::ModelLoad { .. } => "model_load",
            ScanError::PatternLoad(_) => "pattern_load",
            ScanError::Inference(_) => "inference",
            ScanError::ConfigError(_) => "config",
            ScanError::StoreError(_) => "store",
            ScanError::IoError(_) => "io",
            ScanError::JsonError(_) => "json",
            ScanError::TomlError(_) | ScanError::TomlSerError(_) => "toml",
            ScanError::CsvError(_) => "csv",
        }
    }
}

/// Result type alias for pipeline operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Result of one background pass, handed back to the external scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleOutcome {
    /// The pass completed
    Success,
    /// Something transient went wrong; the scheduler should run us again later
    Retry,
    /// Nothing to do this run (auto-scan disabled)
    Skip,
}

impl CycleOutcome {
    /// Process exit code for the `background` subcommand (75 = EX_TEMPFAIL)
    pub fn exit_code(self) -> i32 {
        match self {
            CycleOutcome::Success | CycleOutcome::Skip => 0,
            CycleOutcome::Retry => 75,
        }
    }
}
