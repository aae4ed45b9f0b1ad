use thiserror::Error;

/// All errors produced by emovox-core.
#[derive(Debug, Error)]
pub enum EmovoxError {
    #[error("model artifact not found: {}", path.display())]
    ArtifactNotFound { path: std::path::PathBuf },

    #[error("audio file not found: {}", path.display())]
    AudioNotFound { path: std::path::PathBuf },

    #[error("feature extraction failed: {0}")]
    FeatureExtraction(String),

    #[error("feature dimension mismatch: produced {produced}, scaler expects {expected}")]
    FeatureDimension { produced: usize, expected: usize },

    #[error("classifier produced unknown class id {class_id}")]
    LabelMapping { class_id: i64 },

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EmovoxError>;
