//! Security classification of access points
//!
//! [`SecurityClassifier`] wraps a [`Scorer`] and turns its class scores into a
//! [`SecurityLevel`]. Loading the model happens once; after that every call
//! is stateless. Classification itself never fails: inference errors come
//! back as DANGEROUS.

pub mod features;
pub mod model;
pub mod public_networks;

pub use features::{extract_features, FeatureExtractor, FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};
pub use model::{LinearScorer, Scorer, CLASS_COUNT};
pub use public_networks::PublicNetworkMatcher;

use crate::error::{ScanError, ScanResult};
use crate::network::SecurityLevel;
use log::{debug, error};
use once_cell::sync::OnceCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

/// Pick the class with the highest score. Ties go to the lowest index.
pub fn level_from_scores(scores: &[f32; CLASS_COUNT]) -> SecurityLevel {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = i;
        }
    }

    match best {
        2 => SecurityLevel::Safe,
        1 => SecurityLevel::Medium,
        _ => SecurityLevel::Dangerous,
    }
}

/// Wraps the inference model; loaded once, reused for every call
pub struct SecurityClassifier {
    model_path: Option<PathBuf>,
    // Outcome of the one load attempt, success or failure
    scorer: OnceCell<Result<Arc<dyn Scorer>, String>>,
}

impl SecurityClassifier {
    /// Classifier backed by the packaged model at `path`, loaded on first use
    pub fn from_model_path(path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: Some(path.into()),
            scorer: OnceCell::new(),
        }
    }

    /// Classifier around an already constructed scorer
    pub fn with_scorer(scorer: Arc<dyn Scorer>) -> Self {
        Self {
            model_path: None,
            scorer: OnceCell::with_value(Ok(scorer)),
        }
    }

    fn load(&self) -> Result<Arc<dyn Scorer>, String> {
        let path = self
            .model_path
            .as_ref()
            .ok_or_else(|| "no model configured".to_string())?;

        match LinearScorer::load(path) {
            Ok(scorer) => Ok(Arc::new(scorer) as Arc<dyn Scorer>),
            Err(e) => {
                error!("Classification model unavailable, every network will be DANGEROUS: {}", e);
                Err(match e {
                    ScanError::ModelLoad { reason, .. } => reason,
                    other => other.to_string(),
                })
            }
        }
    }

    /// Load the model if no attempt was made yet. A failed attempt is
    /// remembered and reported again without touching the asset.
    ///
    /// Errors here are fatal for the caller: without a model nothing can be
    /// classified.
    pub fn initialize(&self) -> ScanResult<&Arc<dyn Scorer>> {
        self.scorer
            .get_or_init(|| self.load())
            .as_ref()
            .map_err(|reason| ScanError::ModelLoad {
                path: self
                    .model_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                reason: reason.clone(),
            })
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.scorer.get(), Some(Ok(_)))
    }

    /// Classify one feature vector. Any failure, including a panicking
    /// scorer, maps to DANGEROUS.
    pub fn classify(&self, features: &FeatureVector) -> SecurityLevel {
        let scorer = match self.initialize() {
            Ok(scorer) => scorer,
            Err(e) => {
                debug!("Classifying as DANGEROUS: {}", e);
                return SecurityLevel::Dangerous;
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| scorer.score(features))) {
            Ok(Ok(scores)) => {
                let level = level_from_scores(&scores);
                debug!("{} scores {:?} -> {}", scorer.name(), scores, level);
                level
            }
            Ok(Err(e)) => {
                error!("Inference error, classifying as DANGEROUS: {}", e);
                SecurityLevel::Dangerous
            }
            Err(_) => {
                error!("{} panicked, classifying as DANGEROUS", scorer.name());
                SecurityLevel::Dangerous
            }
        }
    }
}

impl fmt::Debug for SecurityClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityClassifier")
            .field("model_path", &self.model_path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedScorer([f32; CLASS_COUNT]);

    impl Scorer for FixedScorer {
        fn score(&self, _features: &FeatureVector) -> ScanResult<[f32; CLASS_COUNT]> {
            Ok(self.0)
        }
    }

    struct FailingScorer(AtomicUsize);

    impl Scorer for FailingScorer {
        fn score(&self, _features: &FeatureVector) -> ScanResult<[f32; CLASS_COUNT]> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(ScanError::Inference("interpreter crashed".into()))
        }
    }

    fn zeros() -> FeatureVector {
        FeatureVector::from_values([0.0; FEATURE_COUNT])
    }

    #[test]
    fn test_argmax_mapping() {
        assert_eq!(level_from_scores(&[0.1, 0.2, 0.7]), SecurityLevel::Safe);
        assert_eq!(level_from_scores(&[0.1, 0.7, 0.2]), SecurityLevel::Medium);
        assert_eq!(level_from_scores(&[0.7, 0.2, 0.1]), SecurityLevel::Dangerous);
    }

    #[test]
    fn test_ties_resolve_to_lowest_index() {
        assert_eq!(level_from_scores(&[0.5, 0.5, 0.5]), SecurityLevel::Dangerous);
        assert_eq!(level_from_scores(&[0.1, 0.6, 0.6]), SecurityLevel::Medium);
    }

    #[test]
    fn test_nan_scores_are_dangerous() {
        assert_eq!(level_from_scores(&[f32::NAN, f32::NAN, f32::NAN]), SecurityLevel::Dangerous);
    }

    #[test]
    fn test_stub_scorer() {
        let classifier = SecurityClassifier::with_scorer(Arc::new(FixedScorer([0.0, 0.0, 1.0])));
        assert!(classifier.is_loaded());
        assert_eq!(classifier.classify(&zeros()), SecurityLevel::Safe);
    }

    #[test]
    fn test_inference_failure_is_dangerous() {
        let scorer = Arc::new(FailingScorer(AtomicUsize::new(0)));
        let classifier = SecurityClassifier::with_scorer(scorer.clone());
        assert_eq!(classifier.classify(&zeros()), SecurityLevel::Dangerous);
        assert_eq!(classifier.classify(&zeros()), SecurityLevel::Dangerous);
        assert_eq!(scorer.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_model_fails_initialize() {
        let classifier = SecurityClassifier::from_model_path("/nonexistent/wifi_classifier.json");
        assert!(matches!(classifier.initialize(), Err(ScanError::ModelLoad { .. })));
        assert!(!classifier.is_loaded());
        assert_eq!(classifier.classify(&zeros()), SecurityLevel::Dangerous);
    }

    #[test]
    fn test_failed_load_is_not_retried() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wifi_classifier.json");
        let classifier = SecurityClassifier::from_model_path(&path);
        assert!(classifier.initialize().is_err());

        // The asset appearing later does not change the outcome
        std::fs::write(
            &path,
            r#"{"weights": [[0,0,0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0,0,0,0]], "bias": [0, 0, 1]}"#,
        )
        .unwrap();
        assert!(classifier.initialize().is_err());
        assert!(!classifier.is_loaded());
        assert_eq!(classifier.classify(&zeros()), SecurityLevel::Dangerous);

        let fresh = SecurityClassifier::from_model_path(&path);
        assert_eq!(fresh.classify(&zeros()), SecurityLevel::Safe);
    }

    struct PanickingScorer;

    impl Scorer for PanickingScorer {
        fn score(&self, _features: &FeatureVector) -> ScanResult<[f32; CLASS_COUNT]> {
            panic!("interpreter aborted");
        }
    }

    #[test]
    fn test_panicking_scorer_is_dangerous() {
        let classifier = SecurityClassifier::with_scorer(Arc::new(PanickingScorer));
        assert_eq!(classifier.classify(&zeros()), SecurityLevel::Dangerous);
        assert_eq!(classifier.classify(&zeros()), SecurityLevel::Dangerous);
    }
}
