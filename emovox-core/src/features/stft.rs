//! Short-time Fourier transform front end.
//!
//! Centered framing with reflect padding, Hann window, rustfft forward
//! transform. Matches the analysis parameters the model was trained with:
//! 2048-point FFT, 512-sample hop.

use std::sync::Arc;

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

pub const N_FFT: usize = 2048;
pub const HOP: usize = 512;
pub const N_FREQS: usize = N_FFT / 2 + 1; // 1025

/// Reusable STFT plan (window + FFT twiddles built once).
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl Stft {
    pub fn new() -> Self {
        Self {
            fft: FftPlanner::<f32>::new().plan_fft_forward(N_FFT),
            window: build_hann_window(N_FFT),
        }
    }

    /// Power spectrogram `|X|²` with shape `(N_FREQS, n_frames)`.
    ///
    /// Frames are centered: the signal is reflect-padded by `N_FFT / 2` on
    /// both sides, giving `1 + len / HOP` frames.
    pub fn power(&self, samples: &[f32]) -> Array2<f32> {
        let padded = reflect_pad(samples, N_FFT / 2);
        let n_frames = n_frames(samples.len());

        let mut power = Array2::<f32>::zeros((N_FREQS, n_frames));
        let mut fft_buf = vec![Complex::new(0.0f32, 0.0); N_FFT];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for frame in 0..n_frames {
            let start = frame * HOP;
            for i in 0..N_FFT {
                fft_buf[i] = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.fft.process_with_scratch(&mut fft_buf, &mut scratch);

            for (k, c) in fft_buf.iter().take(N_FREQS).enumerate() {
                power[[k, frame]] = c.norm_sqr();
            }
        }

        power
    }
}

impl Default for Stft {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of centered frames for a signal of `len` samples.
pub fn n_frames(len: usize) -> usize {
    1 + len / HOP
}

/// Center frequency of FFT bin `k` in Hz.
pub fn bin_freq(k: usize, sample_rate: u32) -> f32 {
    k as f32 * sample_rate as f32 / N_FFT as f32
}

fn build_hann_window(n: usize) -> Vec<f32> {
    use std::f32::consts::PI;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
        .collect()
}

pub fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    if pad == 0 {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return vec![0.0; pad * 2];
    }
    if samples.len() == 1 {
        return vec![samples[0]; samples.len() + pad * 2];
    }

    let n = samples.len() as isize;
    let mut out = Vec::with_capacity(samples.len() + 2 * pad);
    for i in -(pad as isize)..(n + pad as isize) {
        out.push(samples[reflect_index(i, samples.len())]);
    }
    out
}

fn reflect_index(mut i: isize, len: usize) -> usize {
    let max = len as isize - 1;
    while i < 0 || i > max {
        if i < 0 {
            i = -i;
        } else {
            i = 2 * max - i;
        }
    }
    i as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn frame_count_is_centered() {
        assert_eq!(n_frames(66_150), 130);
        assert_eq!(n_frames(0), 1);
        assert_eq!(n_frames(512), 2);
    }

    #[test]
    fn reflect_pad_mirrors_edges() {
        let out = reflect_pad(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(out, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn sine_energy_concentrates_at_its_bin() {
        // 22050 Hz sine at exactly bin 100 (≈ 1076.7 Hz)
        let sr = 22_050u32;
        let freq = bin_freq(100, sr);
        let samples: Vec<f32> = (0..22_050)
            .map(|i| (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect();

        let stft = Stft::new();
        let power = stft.power(&samples);

        // Pick an interior frame (edges are attenuated by padding).
        let frame = power.ncols() / 2;
        let (max_bin, _) = (0..N_FREQS)
            .map(|k| (k, power[[k, frame]]))
            .fold((0, f32::MIN), |acc, (k, p)| if p > acc.1 { (k, p) } else { acc });

        assert!(
            (max_bin as isize - 100).abs() <= 1,
            "peak at bin {max_bin}, expected ≈100"
        );
    }

    #[test]
    fn power_is_deterministic() {
        let samples: Vec<f32> = (0..4096).map(|i| ((i * 37) % 97) as f32 / 97.0).collect();
        let stft = Stft::new();
        let a = stft.power(&samples);
        let b = stft.power(&samples);
        assert_eq!(a, b);
    }
}
