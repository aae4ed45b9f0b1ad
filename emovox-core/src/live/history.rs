//! Bounded FIFO of recent predictions.

use std::collections::VecDeque;

use crate::model::Emotion;
use crate::predict::PredictionResult;

/// How many recent predictions the live loop keeps.
pub const DEFAULT_CAPACITY: usize = 3;

/// Fixed-capacity FIFO of the most recent predictions, oldest first.
#[derive(Debug, Clone)]
pub struct PredictionHistory {
    entries: VecDeque<PredictionResult>,
    capacity: usize,
}

impl PredictionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a result, evicting the oldest entry when full.
    pub fn push(&mut self, result: PredictionResult) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    /// Most recent result, if any.
    pub fn latest(&self) -> Option<&PredictionResult> {
        self.entries.back()
    }

    /// Oldest-to-newest iteration.
    pub fn iter(&self) -> impl Iterator<Item = &PredictionResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The emotion appearing most often in the window; ties go to the more
    /// recent entry.
    pub fn dominant(&self) -> Option<Emotion> {
        let mut best: Option<(Emotion, usize)> = None;
        for entry in &self.entries {
            let count = self
                .entries
                .iter()
                .filter(|e| e.emotion == entry.emotion)
                .count();
            match best {
                Some((_, n)) if count < n => {}
                _ => best = Some((entry.emotion, count)),
            }
        }
        best.map(|(e, _)| e)
    }
}

impl Default for PredictionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
