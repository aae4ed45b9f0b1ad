//! Trained model artifacts: feature scaler and classifier.
//!
//! Artifacts are exported from the training pipeline as JSON — a
//! [`FeatureScaler`] (per-feature mean/scale) and a [`LinearClassifier`]
//! (one decision row per class). [`ModelArtifact`] loads the pair and is
//! shared behind an `Arc` by everything that predicts.

pub mod labels;

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EmovoxError, Result};

pub use labels::Emotion;

/// Standardization parameters fitted on the training set.
///
/// `transform` maps raw features to z-scores: `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl FeatureScaler {
    /// Feature width this scaler (and therefore the classifier) was fitted on.
    pub fn expected_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize a feature vector in place.
    ///
    /// Callers guarantee `features.len() == expected_features()`; the
    /// prediction path validates widths before reaching here.
    pub fn transform(&self, features: &mut [f64]) {
        for (i, x) in features.iter_mut().enumerate() {
            let s = self.scale[i];
            // scikit-learn stores unit scale for zero-variance columns.
            *x = (*x - self.mean[i]) / if s != 0.0 { s } else { 1.0 };
        }
    }
}

/// Contract every classifier backend implements.
///
/// `classes` is the fitted class-id order; `predict_proba` rows follow it.
pub trait ClassifierModel: Send + Sync {
    /// Predicted class id for one standardized feature vector.
    fn predict(&self, features: &[f64]) -> i64;

    /// Per-class probabilities in `classes()` order, or `None` when the
    /// model was exported without probability support.
    fn predict_proba(&self, features: &[f64]) -> Option<Vec<f64>>;

    /// Class ids in fitted order.
    fn classes(&self) -> &[i64];
}

/// Linear one-vs-rest classifier: one coefficient row and intercept per
/// class, decision by argmax score, softmax probabilities when exported
/// with probability support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    /// `coef[c]` is the weight row for `classes[c]`.
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    pub classes: Vec<i64>,
    /// Whether the export carries calibrated probability support.
    pub probability: bool,
}

impl LinearClassifier {
    fn decision_scores(&self, features: &[f64]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| {
                row.iter()
                    .zip(features)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + b
            })
            .collect()
    }
}

impl ClassifierModel for LinearClassifier {
    fn predict(&self, features: &[f64]) -> i64 {
        let scores = self.decision_scores(features);
        let best = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.classes[best]
    }

    fn predict_proba(&self, features: &[f64]) -> Option<Vec<f64>> {
        if !self.probability {
            return None;
        }
        let scores = self.decision_scores(features);
        let max = scores.iter().fold(f64::MIN, |m, &s| m.max(s));
        let exps: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        Some(exps.iter().map(|e| e / total).collect())
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }
}

/// Loaded scaler + classifier pair.
pub struct ModelArtifact {
    pub scaler: FeatureScaler,
    pub classifier: Box<dyn ClassifierModel>,
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("expected_features", &self.scaler.expected_features())
            .field("classes", &self.classifier.classes())
            .finish_non_exhaustive()
    }
}

impl ModelArtifact {
    /// Load both artifacts from disk.
    ///
    /// # Errors
    /// - `EmovoxError::ArtifactNotFound` when either path is missing.
    /// - `EmovoxError::Other` for malformed JSON.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Arc<Self>> {
        let classifier: LinearClassifier = read_json(model_path)?;
        let scaler: FeatureScaler = read_json(scaler_path)?;

        if classifier.classes.is_empty()
            || classifier.coef.len() != classifier.classes.len()
            || classifier.intercept.len() != classifier.classes.len()
        {
            return Err(anyhow::anyhow!(
                "malformed classifier: {} classes, {} coefficient rows, {} intercepts",
                classifier.classes.len(),
                classifier.coef.len(),
                classifier.intercept.len()
            )
            .into());
        }
        if scaler.mean.len() != scaler.scale.len() {
            return Err(anyhow::anyhow!(
                "malformed scaler: {} means, {} scales",
                scaler.mean.len(),
                scaler.scale.len()
            )
            .into());
        }
        // Every coefficient row must span the scaler's width, otherwise the
        // dot product would silently drop trailing features.
        if let Some(row) = classifier
            .coef
            .iter()
            .find(|row| row.len() != scaler.expected_features())
        {
            return Err(anyhow::anyhow!(
                "artifact width mismatch: classifier row has {} coefficients, scaler provides {} features",
                row.len(),
                scaler.expected_features()
            )
            .into());
        }

        info!(
            model = %model_path.display(),
            scaler = %scaler_path.display(),
            classes = classifier.classes.len(),
            features = scaler.expected_features(),
            probability = classifier.probability,
            "model artifacts loaded"
        );

        Ok(Arc::new(Self {
            scaler,
            classifier: Box::new(classifier),
        }))
    }

    /// Build an artifact from parts already in memory (used by callers that
    /// construct models programmatically and by test doubles).
    pub fn from_parts(scaler: FeatureScaler, classifier: Box<dyn ClassifierModel>) -> Arc<Self> {
        Arc::new(Self { scaler, classifier })
    }

    /// Feature width the prediction path must produce.
    pub fn expected_features(&self) -> usize {
        self.scaler.expected_features()
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(EmovoxError::ArtifactNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)?;
    let value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| anyhow::anyhow!("parse {}: {e}", path.display()))?;
    Ok(value)
}
