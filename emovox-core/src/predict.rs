//! Prediction orchestration: sample buffer or file path in, labeled
//! emotion with a probability distribution out.
//!
//! Batch prediction isolates per-item failures — one unreadable file
//! yields a `None` slot and a warning, never aborts the run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::audio::{decode::decode_wav, AudioConfig, SampleBuffer};
use crate::error::{EmovoxError, Result};
use crate::features::FeatureExtractor;
use crate::model::{Emotion, ModelArtifact};

/// One prediction: the winning emotion plus, when the model supports it,
/// its confidence and the full per-class distribution.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub emotion: Emotion,
    /// Probability of the winning emotion; `None` when the classifier was
    /// exported without probability support.
    pub confidence: Option<f64>,
    /// Per-class probabilities; empty when unsupported.
    pub distribution: HashMap<Emotion, f64>,
}

impl PredictionResult {
    /// The `n` most probable emotions, highest first.
    pub fn top(&self, n: usize) -> Vec<(Emotion, f64)> {
        let mut entries: Vec<(Emotion, f64)> =
            self.distribution.iter().map(|(&e, &p)| (e, p)).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        entries.truncate(n);
        entries
    }
}

/// Shared prediction pipeline: extractor + scaler + classifier.
pub struct Predictor {
    artifact: Arc<ModelArtifact>,
    extractor: FeatureExtractor,
    config: AudioConfig,
}

impl Predictor {
    pub fn new(artifact: Arc<ModelArtifact>, config: AudioConfig) -> Self {
        let extractor = FeatureExtractor::new(config.sample_rate, artifact.expected_features());
        Self {
            artifact,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Predict the emotion of a single audio file.
    pub fn predict_file(&self, path: &Path) -> Result<PredictionResult> {
        let buffer = decode_wav(path, &self.config)?;
        let result = self.predict_samples(&buffer)?;
        info!(
            path = %path.display(),
            emotion = result.emotion.as_str(),
            confidence = result.confidence,
            "file predicted"
        );
        Ok(result)
    }

    /// Predict the emotion of an in-memory sample buffer.
    pub fn predict_samples(&self, buffer: &SampleBuffer) -> Result<PredictionResult> {
        let mut features = self.extractor.extract(buffer)?;
        self.artifact.scaler.transform(&mut features);

        let class_id = self.artifact.classifier.predict(&features);
        let emotion = Emotion::from_class_id(class_id)
            .ok_or(EmovoxError::LabelMapping { class_id })?;

        let mut confidence = None;
        let mut distribution = HashMap::new();
        if let Some(proba) = self.artifact.classifier.predict_proba(&features) {
            for (&id, &p) in self.artifact.classifier.classes().iter().zip(&proba) {
                let class = Emotion::from_class_id(id)
                    .ok_or(EmovoxError::LabelMapping { class_id: id })?;
                distribution.insert(class, p);
            }
            confidence = distribution.get(&emotion).copied();
        }

        Ok(PredictionResult {
            emotion,
            confidence,
            distribution,
        })
    }

    /// Predict a batch of files, isolating failures per item.
    ///
    /// The output is index-aligned with `paths`; a failed item is `None`
    /// and is logged, the rest of the batch proceeds.
    pub fn predict_all(&self, paths: &[&Path]) -> Vec<Option<PredictionResult>> {
        paths
            .iter()
            .map(|path| match self.predict_file(path) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "prediction failed");
                    None
                }
            })
            .collect()
    }
}
