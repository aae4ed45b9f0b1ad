//! WAV decoding to mono f32 at the analysis rate.
//!
//! Mirrors what the training pipeline saw: mono downmix, resample to the
//! analysis rate, truncate to the analysis duration. Files shorter than the
//! duration are returned as-is — feature aggregation handles short buffers.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use crate::audio::resample::RateConverter;
use crate::audio::{AudioConfig, SampleBuffer};
use crate::error::{EmovoxError, Result};

/// Decode a WAV file into a mono `SampleBuffer` at `config.sample_rate`,
/// truncated to `config.duration_secs`.
///
/// # Errors
/// - `EmovoxError::AudioNotFound` when the path does not exist.
/// - `EmovoxError::FeatureExtraction` wrapping any hound decode failure.
pub fn decode_wav(path: &Path, config: &AudioConfig) -> Result<SampleBuffer> {
    if !path.exists() {
        return Err(EmovoxError::AudioNotFound {
            path: path.to_path_buf(),
        });
    }

    let reader = WavReader::open(path)
        .map_err(|e| EmovoxError::FeatureExtraction(format!("wav open {}: {e}", path.display())))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    // Only decode what the analysis window needs (plus the frames lost to
    // integer truncation of the rate ratio).
    let max_source_frames =
        (config.duration_secs * spec.sample_rate as f32).ceil() as usize + 1;

    let mono = read_mono(reader, spec.sample_format, spec.bits_per_sample, channels, max_source_frames)?;

    debug!(
        path = %path.display(),
        source_rate = spec.sample_rate,
        channels,
        frames = mono.len(),
        "decoded wav"
    );

    let mut converter = RateConverter::new(spec.sample_rate, config.sample_rate)?;
    let samples = converter.convert_all(&mono);

    let mut buffer = SampleBuffer::new(samples, config.sample_rate);
    buffer.clip_to(config.duration_secs);
    Ok(buffer)
}

fn read_mono<R: std::io::Read>(
    mut reader: WavReader<R>,
    format: SampleFormat,
    bits: u16,
    channels: usize,
    max_frames: usize,
) -> Result<Vec<f32>> {
    let mut mono = Vec::with_capacity(max_frames.min(1 << 20));
    let mut frame = Vec::with_capacity(channels);

    macro_rules! downmix {
        ($iter:expr, $to_f32:expr) => {
            for sample in $iter {
                let s = sample
                    .map_err(|e| EmovoxError::FeatureExtraction(format!("wav decode: {e}")))?;
                frame.push($to_f32(s));
                if frame.len() == channels {
                    mono.push(frame.iter().sum::<f32>() / channels as f32);
                    frame.clear();
                    if mono.len() >= max_frames {
                        break;
                    }
                }
            }
        };
    }

    match format {
        SampleFormat::Float => {
            downmix!(reader.samples::<f32>(), |s: f32| s);
        }
        SampleFormat::Int => {
            let norm = (1i64 << (bits - 1)) as f32;
            downmix!(reader.samples::<i32>(), |s: i32| s as f32 / norm);
        }
    }

    Ok(mono)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, secs: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (secs * sample_rate as f32) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let v = (0.5 * (2.0 * PI * 440.0 * t).sin() * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn missing_file_is_audio_not_found() {
        let err = decode_wav(Path::new("/no/such/file.wav"), &AudioConfig::default())
            .expect_err("expected failure");
        assert!(matches!(err, EmovoxError::AudioNotFound { .. }));
    }

    #[test]
    fn decodes_stereo_at_native_rate_to_mono() {
        let dir = std::env::temp_dir();
        let path = dir.join("emovox_decode_stereo.wav");
        write_test_wav(&path, 22_050, 2, 1.0);

        let buf = decode_wav(&path, &AudioConfig::default()).unwrap();
        assert_eq!(buf.sample_rate, 22_050);
        assert_eq!(buf.samples.len(), 22_050);
        assert!(buf.peak() > 0.4);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn resamples_and_truncates_to_duration() {
        let dir = std::env::temp_dir();
        let path = dir.join("emovox_decode_44k.wav");
        write_test_wav(&path, 44_100, 1, 5.0);

        let cfg = AudioConfig::default();
        let buf = decode_wav(&path, &cfg).unwrap();
        assert_eq!(buf.sample_rate, 22_050);
        assert_eq!(buf.samples.len(), cfg.samples_per_recording());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn short_file_is_not_padded() {
        let dir = std::env::temp_dir();
        let path = dir.join("emovox_decode_short.wav");
        write_test_wav(&path, 22_050, 1, 0.5);

        let buf = decode_wav(&path, &AudioConfig::default()).unwrap();
        assert_eq!(buf.samples.len(), 11_025);

        std::fs::remove_file(&path).ok();
    }
}
