//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! Decoded WAV files and capture devices commonly run at 44.1/48 kHz while
//! the trained model expects 22.05 kHz mono. `RateConverter` bridges that
//! gap on the (non-RT) calling thread.
//!
//! When source rate == target rate the converter is a zero-copy passthrough
//! and no rubato session is created at all.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::error::{EmovoxError, Result};

/// Input frame count per rubato call.
const CHUNK: usize = 1024;

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when source rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Accumulation buffer — holds partial input chunks between calls.
    input_buf: Vec<f32>,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
    source_rate: u32,
    target_rate: u32,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Errors
    /// Returns `EmovoxError::AudioDevice` if rubato fails to initialise.
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self> {
        if source_rate == target_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                output_buf: Vec::new(),
                source_rate,
                target_rate,
            });
        }

        let ratio = target_rate as f64 / source_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            PolynomialDegree::Cubic,
            CHUNK,
            1, // mono
        )
        .map_err(|e| EmovoxError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::new(),
            output_buf,
            source_rate,
            target_rate,
        })
    }

    /// Process incoming samples, returning resampled output (may be empty).
    ///
    /// Samples are accumulated internally until a full chunk is available
    /// for rubato. Any remainder is kept for the next call.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            // Zero-copy passthrough
            return samples.to_vec();
        };

        self.input_buf.extend_from_slice(samples);

        let mut result = Vec::new();

        while self.input_buf.len() >= CHUNK {
            let input_slice = &self.input_buf[..CHUNK];

            match resampler.process_into_buffer(&[input_slice], &mut self.output_buf, None) {
                Ok((_consumed, produced)) => {
                    result.extend_from_slice(&self.output_buf[0][..produced]);
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }

            self.input_buf.drain(..CHUNK);
        }

        result
    }

    /// Convert a whole signal in one shot.
    ///
    /// Flushes the tail with a zero-padded final chunk and truncates the
    /// output to the rate-proportional length, so short recordings do not
    /// lose their ending to rubato's chunking.
    pub fn convert_all(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.is_passthrough() {
            return samples.to_vec();
        }

        let expected =
            (samples.len() as u64 * self.target_rate as u64 / self.source_rate as u64) as usize;

        let mut out = self.process(samples);
        if out.len() < expected {
            let flush = vec![0f32; 2 * CHUNK];
            out.extend(self.process(&flush));
        }
        out.truncate(expected);
        out
    }

    /// Returns `true` when source rate == target rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}
