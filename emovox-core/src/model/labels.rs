//! Emotion label vocabulary.
//!
//! Class ids 1 through 8 are fixed by the training corpus; the classifier
//! emits ids and this module is the single mapping to display names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The eight emotion classes the model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Neutral,
    Calm,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgust,
    Surprised,
}

impl Emotion {
    /// Map a classifier class id to its emotion, `None` for unknown ids.
    pub fn from_class_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Neutral),
            2 => Some(Self::Calm),
            3 => Some(Self::Happy),
            4 => Some(Self::Sad),
            5 => Some(Self::Angry),
            6 => Some(Self::Fearful),
            7 => Some(Self::Disgust),
            8 => Some(Self::Surprised),
            _ => None,
        }
    }

    pub fn class_id(self) -> i64 {
        match self {
            Self::Neutral => 1,
            Self::Calm => 2,
            Self::Happy => 3,
            Self::Sad => 4,
            Self::Angry => 5,
            Self::Fearful => 6,
            Self::Disgust => 7,
            Self::Surprised => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Calm => "calm",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fearful => "fearful",
            Self::Disgust => "disgust",
            Self::Surprised => "surprised",
        }
    }

    /// All emotions in class-id order.
    pub fn all() -> [Emotion; 8] {
        [
            Self::Neutral,
            Self::Calm,
            Self::Happy,
            Self::Sad,
            Self::Angry,
            Self::Fearful,
            Self::Disgust,
            Self::Surprised,
        ]
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
