//! Feature extraction: waveform → fixed-length feature vector.
//!
//! ```text
//!              ┌─────────┐    ┌──────────────┐    ┌───────────────┐
//!  waveform ──▶│  STFT   │───▶│ MFCC + Δ + ΔΔ│───▶│  aggregation  │──▶ vector
//!              └─────────┘    └──────────────┘    └───────────────┘
//!                   │                                     ▲
//!                   └──────▶ centroid / rolloff ──────────┤
//!  waveform ───────────────▶ zero-crossing rate ──────────┘
//! ```
//!
//! The vector layout is fixed and ordered; the classifier's coefficients
//! are positional, so reordering or re-deriving any block is a breaking
//! change to every trained artifact.
//!
//! ## Layout (81 values)
//!
//! | slot    | contents                      |
//! |---------|-------------------------------|
//! | 0..13   | MFCC means                    |
//! | 13..26  | MFCC stds                     |
//! | 26..39  | delta means                   |
//! | 39..52  | delta stds                    |
//! | 52..65  | delta-delta means             |
//! | 65..78  | delta-delta stds              |
//! | 78      | spectral centroid mean (Hz)   |
//! | 79      | spectral rolloff mean (Hz)    |
//! | 80      | zero-crossing rate mean       |

pub mod mfcc;
pub mod spectral;
pub mod stft;

use ndarray::Array2;
use tracing::debug;

use crate::audio::SampleBuffer;
use crate::error::{EmovoxError, Result};
use crate::features::mfcc::N_MFCC;
use crate::features::stft::Stft;

/// Number of features this pipeline natively produces.
pub const BASE_FEATURES: usize = 6 * N_MFCC + 3; // 81

/// Stateless-per-call extractor; filterbank and FFT plan are built once.
pub struct FeatureExtractor {
    stft: Stft,
    mel_filters: Array2<f32>,
    sample_rate: u32,
    /// Vector length the downstream model expects (from the scaler).
    expected_features: usize,
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32, expected_features: usize) -> Self {
        Self {
            stft: Stft::new(),
            mel_filters: mfcc::build_mel_filters(sample_rate),
            sample_rate,
            expected_features,
        }
    }

    /// Extract the full feature vector from a sample buffer.
    ///
    /// # Errors
    /// - `EmovoxError::FeatureExtraction` for an empty buffer or a sample
    ///   rate different from the one the extractor was built for.
    /// - `EmovoxError::FeatureDimension` when the produced count cannot be
    ///   reconciled with `expected_features` (see [`reconcile`]).
    pub fn extract(&self, buffer: &SampleBuffer) -> Result<Vec<f64>> {
        if buffer.is_empty() {
            return Err(EmovoxError::FeatureExtraction(
                "empty sample buffer".into(),
            ));
        }
        if buffer.sample_rate != self.sample_rate {
            return Err(EmovoxError::FeatureExtraction(format!(
                "sample rate mismatch: buffer {} Hz, extractor {} Hz",
                buffer.sample_rate, self.sample_rate
            )));
        }

        let power = self.stft.power(&buffer.samples);

        let coeffs = mfcc::mfcc(&power, &self.mel_filters);
        let d1 = mfcc::delta(&coeffs);
        let d2 = mfcc::delta(&d1);

        let mut features = Vec::with_capacity(BASE_FEATURES);
        push_row_stats(&mut features, &coeffs);
        push_row_stats(&mut features, &d1);
        push_row_stats(&mut features, &d2);

        features.push(spectral::centroid_mean(&power, self.sample_rate));
        features.push(spectral::rolloff_mean(&power, self.sample_rate));
        features.push(spectral::zcr_mean(&buffer.samples));

        debug_assert_eq!(features.len(), BASE_FEATURES);
        debug!(
            produced = features.len(),
            frames = power.ncols(),
            "features extracted"
        );

        reconcile(features, self.expected_features)
    }
}

/// Append per-row mean then per-row population std for every row of `m`.
fn push_row_stats(out: &mut Vec<f64>, m: &Array2<f32>) {
    let (rows, cols) = m.dim();
    let mut means = Vec::with_capacity(rows);

    for r in 0..rows {
        let mut sum = 0.0f64;
        for c in 0..cols {
            sum += m[[r, c]] as f64;
        }
        means.push(sum / cols as f64);
    }
    out.extend_from_slice(&means);

    for r in 0..rows {
        let mut var = 0.0f64;
        for c in 0..cols {
            let d = m[[r, c]] as f64 - means[r];
            var += d * d;
        }
        out.push((var / cols as f64).sqrt());
    }
}

/// Reconcile the produced vector with the model's expected width.
///
/// Artifacts trained before the schema was frozen carry one or two extra
/// all-zero columns; those exact widths are padded with zeros. Any other
/// mismatch is a hard error — truncating or padding arbitrary widths would
/// feed the classifier garbage.
fn reconcile(mut features: Vec<f64>, expected: usize) -> Result<Vec<f64>> {
    let produced = features.len();
    match (produced, expected) {
        (p, e) if p == e => Ok(features),
        (BASE_FEATURES, e) if e == BASE_FEATURES + 1 || e == BASE_FEATURES + 2 => {
            features.resize(e, 0.0);
            debug!(produced, expected = e, "padded legacy feature width");
            Ok(features)
        }
        (produced, expected) => Err(EmovoxError::FeatureDimension { produced, expected }),
    }
}
