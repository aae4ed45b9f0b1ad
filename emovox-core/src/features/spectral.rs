//! Frame-level spectral descriptors: centroid, rolloff, zero-crossing rate.
//!
//! Centroid and rolloff operate on the magnitude spectrum of the shared
//! STFT; ZCR works on the raw waveform with its own centered framing.

use ndarray::Array2;

use crate::features::stft::{bin_freq, HOP, N_FFT};

/// Rolloff keeps the frequency below which this fraction of the frame's
/// spectral magnitude lies.
const ROLLOFF_PERCENT: f32 = 0.85;

/// Mean spectral centroid (Hz) across frames.
///
/// Per frame: Σ f·|S| / Σ|S|; silent frames contribute 0 Hz.
pub fn centroid_mean(power: &Array2<f32>, sample_rate: u32) -> f64 {
    let (n_freqs, n_frames) = power.dim();
    if n_frames == 0 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    for frame in 0..n_frames {
        let mut weighted = 0.0f64;
        let mut total = 0.0f64;
        for k in 0..n_freqs {
            let mag = power[[k, frame]].sqrt() as f64;
            weighted += bin_freq(k, sample_rate) as f64 * mag;
            total += mag;
        }
        if total > 0.0 {
            sum += weighted / total;
        }
    }
    sum / n_frames as f64
}

/// Mean spectral rolloff (Hz) across frames.
///
/// Per frame: the center frequency of the first bin where the cumulative
/// magnitude reaches [`ROLLOFF_PERCENT`] of the frame total.
pub fn rolloff_mean(power: &Array2<f32>, sample_rate: u32) -> f64 {
    let (n_freqs, n_frames) = power.dim();
    if n_frames == 0 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut mags = vec![0.0f64; n_freqs];

    for frame in 0..n_frames {
        let mut total = 0.0f64;
        for k in 0..n_freqs {
            mags[k] = power[[k, frame]].sqrt() as f64;
            total += mags[k];
        }
        if total <= 0.0 {
            continue; // silent frame rolls off at 0 Hz
        }

        let threshold = ROLLOFF_PERCENT as f64 * total;
        let mut cumulative = 0.0f64;
        for k in 0..n_freqs {
            cumulative += mags[k];
            if cumulative >= threshold {
                sum += bin_freq(k, sample_rate) as f64;
                break;
            }
        }
    }
    sum / n_frames as f64
}

/// Mean zero-crossing rate across centered frames.
///
/// The waveform is edge-padded (first/last samples repeated) by half a
/// frame on each side; per frame the rate is sign changes / frame length.
pub fn zcr_mean(samples: &[f32]) -> f64 {
    const FRAME: usize = N_FFT;

    if samples.is_empty() {
        return 0.0;
    }

    let pad = FRAME / 2;
    let last = samples[samples.len() - 1];
    let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
    padded.extend(std::iter::repeat(samples[0]).take(pad));
    padded.extend_from_slice(samples);
    padded.extend(std::iter::repeat(last).take(pad));

    let n_frames = 1 + samples.len() / HOP;
    let mut sum = 0.0f64;

    for frame in 0..n_frames {
        let start = frame * HOP;
        let window = &padded[start..start + FRAME];
        let mut crossings = 0usize;
        for pair in window.windows(2) {
            if (pair[0] >= 0.0) != (pair[1] >= 0.0) {
                crossings += 1;
            }
        }
        sum += crossings as f64 / FRAME as f64;
    }

    sum / n_frames as f64
}
