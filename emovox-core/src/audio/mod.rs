//! Audio sources: decoded files and live microphone capture.
//!
//! Both paths converge on [`SampleBuffer`] — mono f32 PCM at the analysis
//! sample rate — before feature extraction. Decoding and capture happen at
//! whatever rate the file/device provides and are resampled here.

pub mod decode;
pub mod resample;

#[cfg(feature = "audio-cpal")]
pub mod capture;

use crate::error::Result;

/// A contiguous block of mono PCM samples at a known sample rate.
///
/// Owned transiently by the caller of the feature extractor.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// Mono f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 22050).
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Returns the duration of this buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Returns true if the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Peak absolute amplitude, 0.0 for an empty buffer.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Truncate in place so the buffer holds at most `duration_secs` of audio.
    pub fn clip_to(&mut self, duration_secs: f32) {
        let max_len = (duration_secs * self.sample_rate as f32) as usize;
        self.samples.truncate(max_len);
    }
}

/// Fixed analysis parameters shared by training and inference.
///
/// These must match the values the model artifact was fitted with — feature
/// semantics are rate/duration-dependent.
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    /// Analysis sample rate in Hz. Default: 22050.
    pub sample_rate: u32,
    /// Analysis window per recording in seconds. Default: 3.0.
    pub duration_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            duration_secs: 3.0,
        }
    }
}

impl AudioConfig {
    /// Number of samples in one full recording at the analysis rate.
    pub fn samples_per_recording(&self) -> usize {
        (self.duration_secs * self.sample_rate as f32) as usize
    }
}

/// Contract for blocking audio sources driven by the live loop.
///
/// `record` blocks the calling thread until one full recording window has
/// been collected — no partial results. Test doubles script this.
pub trait CaptureSource {
    fn record(&mut self, config: &AudioConfig) -> Result<SampleBuffer>;
}
