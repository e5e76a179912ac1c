//! Inference model behind the security classifier
//!
//! The classifier only depends on the [`Scorer`] contract: a 1x10 input in,
//! a 1x3 class-score array out. The packaged model is a single dense layer
//! stored as JSON; tests swap in deterministic stubs.

use super::features::{FeatureVector, FEATURE_COUNT};
use crate::error::{ScanError, ScanResult};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Number of output classes (index 0 DANGEROUS, 1 MEDIUM, 2 SAFE)
pub const CLASS_COUNT: usize = 3;

/// Black-box inference capability: feature vector in, class scores out
pub trait Scorer: Send + Sync {
    fn score(&self, features: &FeatureVector) -> ScanResult<[f32; CLASS_COUNT]>;

    /// Name shown in logs
    fn name(&self) -> &str {
        "scorer"
    }
}

/// On-disk layout of the packaged model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModelFile {
    #[serde(default)]
    pub name: Option<String>,
    /// One row of `FEATURE_COUNT` weights per class
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

/// Dense layer scorer: `scores = W · x + b`
#[derive(Debug, Clone)]
pub struct LinearScorer {
    name: String,
    weights: [[f32; FEATURE_COUNT]; CLASS_COUNT],
    bias: [f32; CLASS_COUNT],
}

impl LinearScorer {
    pub fn new(weights: [[f32; FEATURE_COUNT]; CLASS_COUNT], bias: [f32; CLASS_COUNT]) -> Self {
        Self {
            name: "linear".to_string(),
            weights,
            bias,
        }
    }

    /// Validate the shapes of a decoded model file
    pub fn from_model_file(file: LinearModelFile) -> Result<Self, String> {
        if file.weights.len() != CLASS_COUNT {
            return Err(format!(
                "expected {} weight rows, found {}",
                CLASS_COUNT,
                file.weights.len()
            ));
        }
        if file.bias.len() != CLASS_COUNT {
            return Err(format!("expected {} biases, found {}", CLASS_COUNT, file.bias.len()));
        }

        let mut weights = [[0.0f32; FEATURE_COUNT]; CLASS_COUNT];
        for (class, row) in file.weights.iter().enumerate() {
            if row.len() != FEATURE_COUNT {
                return Err(format!(
                    "weight row {} has {} columns, expected {}",
                    class,
                    row.len(),
                    FEATURE_COUNT
                ));
            }
            weights[class].copy_from_slice(row);
        }

        let mut bias = [0.0f32; CLASS_COUNT];
        bias.copy_from_slice(&file.bias);

        Ok(Self {
            name: file.name.unwrap_or_else(|| "linear".to_string()),
            weights,
            bias,
        })
    }

    /// Open and parse a model asset. Fails loudly on any problem.
    pub fn load<P: AsRef<Path>>(path: P) -> ScanResult<Self> {
        let path = path.as_ref();
        let model_err = |reason: String| ScanError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };

        let content = fs::read_to_string(path).map_err(|e| model_err(e.to_string()))?;
        let file: LinearModelFile =
            serde_json::from_str(&content).map_err(|e| model_err(e.to_string()))?;
        let scorer = Self::from_model_file(file).map_err(model_err)?;

        info!("Loaded classification model '{}' from {}", scorer.name, path.display());
        Ok(scorer)
    }
}

impl Scorer for LinearScorer {
    fn score(&self, features: &FeatureVector) -> ScanResult<[f32; CLASS_COUNT]> {
        let mut out = self.bias;
        for (class, row) in self.weights.iter().enumerate() {
            out[class] += row
                .iter()
                .zip(features.values.iter())
                .map(|(w, x)| w * x)
                .sum::<f32>();
        }

        if out.iter().any(|v| !v.is_finite()) {
            return Err(ScanError::Inference(format!("non-finite scores {:?}", out)));
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
