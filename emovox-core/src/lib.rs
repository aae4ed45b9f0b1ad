//! # emovox-core
//!
//! Reusable speech emotion recognition engine.
//!
//! ## Architecture
//!
//! ```text
//! WAV file / Microphone → SampleBuffer (22.05 kHz mono, ≤ 3 s)
//!                               │
//!                        FeatureExtractor
//!               (13 MFCC + Δ + ΔΔ stats, centroid, rolloff, ZCR)
//!                               │
//!                    ModelArtifact (scaler + classifier)
//!                               │
//!                PredictionResult { emotion, confidence, distribution }
//! ```
//!
//! The artifact is loaded once and shared read-only (`Arc`) by every
//! prediction. All inference is synchronous CPU work on the calling thread;
//! only audio capture and the inter-recording pause block.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod error;
pub mod features;
pub mod live;
pub mod model;
pub mod predict;

// Convenience re-exports for downstream crates
pub use audio::{AudioConfig, CaptureSource, SampleBuffer};
pub use error::EmovoxError;
pub use features::FeatureExtractor;
pub use live::{LiveConfig, LiveDetector, PredictionHistory};
pub use model::{Emotion, ModelArtifact};
pub use predict::{PredictionResult, Predictor};
