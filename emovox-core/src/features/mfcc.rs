//! Mel-frequency cepstral coefficients and their temporal derivatives.
//!
//! The chain is: power spectrogram → 128-band Slaney mel filterbank →
//! log-power (dB, 80 dB floor below the peak) → orthonormal DCT-II → first
//! 13 coefficients per frame. Delta and delta-delta tracks come from a
//! 9-point local linear regression over the coefficient trajectories.
//!
//! All constants replicate the analysis the model was trained against;
//! changing any of them silently invalidates the classifier.

use ndarray::Array2;

use crate::features::stft::{N_FFT, N_FREQS};

pub const N_MELS: usize = 128;
pub const N_MFCC: usize = 13;

/// Regression half-width for delta features (9-point window).
const DELTA_HALF_WIDTH: isize = 4;

/// Mel filterbank with Slaney-style band edges and area normalization.
///
/// Shape `(N_MELS, N_FREQS)`; row `m` holds the triangular weights of mel
/// band `m` over the FFT bins.
pub fn build_mel_filters(sample_rate: u32) -> Array2<f32> {
    let f_min = 0.0f32;
    let f_max = sample_rate as f32 / 2.0;

    let mel_min = hz_to_mel_slaney(f_min);
    let mel_max = hz_to_mel_slaney(f_max);

    // N_MELS + 2 edge frequencies, evenly spaced on the mel scale.
    let mel_points: Vec<f32> = (0..N_MELS + 2)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (N_MELS + 1) as f32)
        .collect();
    let hz_points: Vec<f32> = mel_points.iter().map(|&m| mel_to_hz_slaney(m)).collect();

    let mut filters = Array2::<f32>::zeros((N_MELS, N_FREQS));

    for m in 0..N_MELS {
        let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
        // Slaney normalization: each band integrates to the same energy.
        let enorm = 2.0 / (right - left);

        for k in 0..N_FREQS {
            let freq = k as f32 * sample_rate as f32 / N_FFT as f32;
            let weight = if freq <= left || freq >= right {
                0.0
            } else if freq <= center {
                (freq - left) / (center - left)
            } else {
                (right - freq) / (right - center)
            };
            filters[[m, k]] = weight * enorm;
        }
    }

    filters
}

fn hz_to_mel_slaney(hz: f32) -> f32 {
    // Linear below 1 kHz, logarithmic above.
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_78; // ln(6.4) / 27

    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / LOGSTEP
    }
}

fn mel_to_hz_slaney(mel: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_78;

    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * ((mel - MIN_LOG_MEL) * LOGSTEP).exp()
    }
}

/// Convert a mel power spectrogram to dB in place.
///
/// `db = 10·log10(max(p, 1e-10))`, then clamped to no more than 80 dB below
/// the global peak.
pub fn power_to_db(mel_power: &mut Array2<f32>) {
    const AMIN: f32 = 1e-10;
    const TOP_DB: f32 = 80.0;

    for v in mel_power.iter_mut() {
        *v = 10.0 * v.max(AMIN).log10();
    }

    let peak = mel_power.iter().fold(f32::MIN, |m, &v| m.max(v));
    let floor = peak - TOP_DB;
    for v in mel_power.iter_mut() {
        *v = v.max(floor);
    }
}

/// MFCC matrix of shape `(N_MFCC, n_frames)` from a power spectrogram.
///
/// `filters` must come from [`build_mel_filters`] at the matching rate.
pub fn mfcc(power: &Array2<f32>, filters: &Array2<f32>) -> Array2<f32> {
    let n_frames = power.ncols();

    // Mel projection: (N_MELS, N_FREQS) × (N_FREQS, n_frames).
    let mut mel_power = filters.dot(power);
    power_to_db(&mut mel_power);

    // Orthonormal DCT-II over the mel axis, keeping the first N_MFCC rows.
    let mut coeffs = Array2::<f32>::zeros((N_MFCC, n_frames));
    let scale0 = (1.0 / N_MELS as f32).sqrt();
    let scale = (2.0 / N_MELS as f32).sqrt();

    for frame in 0..n_frames {
        for k in 0..N_MFCC {
            let mut acc = 0.0f32;
            for m in 0..N_MELS {
                let angle =
                    std::f32::consts::PI * (m as f32 + 0.5) * k as f32 / N_MELS as f32;
                acc += mel_power[[m, frame]] * angle.cos();
            }
            coeffs[[k, frame]] = acc * if k == 0 { scale0 } else { scale };
        }
    }

    coeffs
}

/// First-order local regression delta of each coefficient trajectory.
///
/// 9-point window with edge-clamped indices; applying it twice yields the
/// delta-delta track.
pub fn delta(coeffs: &Array2<f32>) -> Array2<f32> {
    let (n_coeffs, n_frames) = coeffs.dim();
    let mut out = Array2::<f32>::zeros((n_coeffs, n_frames));

    // denom = 2 * Σ n² for n in 1..=4
    let denom: f32 = 2.0
        * (1..=DELTA_HALF_WIDTH)
            .map(|n| (n * n) as f32)
            .sum::<f32>();

    let clamp = |t: isize| -> usize { t.clamp(0, n_frames as isize - 1) as usize };

    for c in 0..n_coeffs {
        for t in 0..n_frames as isize {
            let mut acc = 0.0f32;
            for n in 1..=DELTA_HALF_WIDTH {
                acc += n as f32 * (coeffs[[c, clamp(t + n)]] - coeffs[[c, clamp(t - n)]]);
            }
            out[[c, t as usize]] = acc / denom;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn mel_scale_round_trips() {
        for hz in [0.0f32, 110.0, 440.0, 1000.0, 4000.0, 11_025.0] {
            let back = mel_to_hz_slaney(hz_to_mel_slaney(hz));
            assert_relative_eq!(back, hz, max_relative = 1e-4);
        }
    }

    #[test]
    fn mel_scale_is_linear_below_1khz() {
        assert_relative_eq!(hz_to_mel_slaney(500.0), 7.5, max_relative = 1e-5);
        assert_relative_eq!(hz_to_mel_slaney(1000.0), 15.0, max_relative = 1e-5);
    }

    #[test]
    fn filterbank_shape_and_band_support() {
        let filters = build_mel_filters(22_050);
        assert_eq!(filters.dim(), (N_MELS, N_FREQS));

        // Every band has at least one positive weight and no negatives.
        for m in 0..N_MELS {
            let row = filters.row(m);
            assert!(row.iter().any(|&w| w > 0.0), "band {m} is empty");
            assert!(row.iter().all(|&w| w >= 0.0));
        }
    }

    #[test]
    fn power_to_db_floors_at_80_below_peak() {
        let mut mel = Array2::from_shape_vec((1, 3), vec![1.0f32, 1e-6, 0.0]).unwrap();
        power_to_db(&mut mel);
        // peak = 0 dB; 1e-6 → -60 dB survives; 0 → clamped to -80 dB
        assert_relative_eq!(mel[[0, 0]], 0.0, epsilon = 1e-5);
        assert_relative_eq!(mel[[0, 1]], -60.0, epsilon = 1e-4);
        assert_relative_eq!(mel[[0, 2]], -80.0, epsilon = 1e-4);
    }

    #[test]
    fn delta_of_constant_track_is_zero() {
        let coeffs = Array2::from_elem((2, 20), 3.5f32);
        let d = delta(&coeffs);
        assert!(d.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn delta_of_linear_ramp_is_slope() {
        // x[t] = 0.5 t — the regression recovers the slope exactly away
        // from the clamped edges.
        let n = 30;
        let mut coeffs = Array2::<f32>::zeros((1, n));
        for t in 0..n {
            coeffs[[0, t]] = 0.5 * t as f32;
        }
        let d = delta(&coeffs);
        for t in 4..n - 4 {
            assert_relative_eq!(d[[0, t]], 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn mfcc_shape_matches_frames() {
        let power = Array2::from_elem((N_FREQS, 10), 0.01f32);
        let filters = build_mel_filters(22_050);
        let coeffs = mfcc(&power, &filters);
        assert_eq!(coeffs.dim(), (N_MFCC, 10));
    }
}
