//! Microphone capture via cpal.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It must not allocate after warm-up, block on a lock, or perform I/O. The
//! callback therefore only downmixes into a reusable scratch buffer and
//! writes into a lock-free SPSC ring; [`MicSource::record`] drains the
//! consumer half on the calling thread until one full recording window has
//! been collected.
//!
//! `cpal::Stream` is `!Send` on Windows/macOS, so a `MicSource` must be
//! created, used and dropped on the same thread. The live loop is a single
//! blocking thread, which satisfies that naturally.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use tracing::{error, info, warn};

use crate::audio::resample::RateConverter;
use crate::audio::{AudioConfig, CaptureSource, SampleBuffer};
use crate::error::{EmovoxError, Result};

type CaptureProducer = ringbuf::HeapProd<f32>;
type CaptureConsumer = ringbuf::HeapCons<f32>;

/// Ring capacity: 2^20 f32 samples ≈ 21.8 s at 48 kHz — several recording
/// windows of headroom so a slow drain never drops frames mid-recording.
const RING_CAPACITY: usize = 1 << 20;

/// Sleep while the ring is empty (avoids busy-wait burning a core).
const EMPTY_SLEEP: Duration = Duration::from_millis(5);

/// Blocking microphone source backed by the default input device.
///
/// The stream runs for the lifetime of the source; the callback no-ops
/// while no recording is in progress so the ring holds no stale audio.
pub struct MicSource {
    /// Kept alive so the stream is not dropped prematurely.
    _stream: Stream,
    consumer: CaptureConsumer,
    /// `true` only while `record` is draining — gates the callback.
    capturing: Arc<AtomicBool>,
    /// Capture rate reported by the device (Hz).
    pub capture_rate: u32,
}

impl MicSource {
    /// Open the system default microphone.
    ///
    /// # Errors
    /// Returns `EmovoxError::NoDefaultInputDevice` when no microphone is
    /// available, or `EmovoxError::AudioStream` if cpal fails to build or
    /// start the stream.
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(EmovoxError::NoDefaultInputDevice)?;

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| EmovoxError::AudioDevice(e.to_string()))?;

        let capture_rate = supported.sample_rate().0;
        let channels = supported.channels();

        info!(capture_rate, channels, "audio config selected");

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(capture_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (producer, consumer) = HeapRb::<f32>::new(RING_CAPACITY).split();
        let capturing = Arc::new(AtomicBool::new(false));

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, producer, &capturing, |s| s),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, producer, &capturing, |s| {
                s as f32 / 32_768.0
            }),
            SampleFormat::U8 => build_stream::<u8>(&device, &config, producer, &capturing, |s| {
                (s as f32 - 128.0) / 128.0
            }),
            fmt => {
                return Err(EmovoxError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| EmovoxError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| EmovoxError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            consumer,
            capturing,
            capture_rate,
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: CaptureProducer,
    capturing: &Arc<AtomicBool>,
    to_f32: impl Fn(T) -> f32 + Send + 'static,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + Send + 'static,
{
    let capturing = Arc::clone(capturing);
    let channels = config.channels as usize;
    let mut mix_buf: Vec<f32> = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _info| {
            if !capturing.load(Ordering::Relaxed) {
                return;
            }
            let frames = data.len() / channels;
            mix_buf.resize(frames, 0.0);
            for f in 0..frames {
                let base = f * channels;
                let mut sum = 0f32;
                for c in 0..channels {
                    sum += to_f32(data[base + c]);
                }
                mix_buf[f] = sum / channels as f32;
            }
            let written = producer.push_slice(&mix_buf);
            if written < mix_buf.len() {
                warn!("ring buffer full: dropped {} frames", mix_buf.len() - written);
            }
        },
        |err| error!("audio stream error: {err}"),
        None,
    )
}

impl CaptureSource for MicSource {
    /// Block until one full recording window has been captured, then
    /// resample to the analysis rate and truncate to the analysis duration.
    fn record(&mut self, config: &AudioConfig) -> Result<SampleBuffer> {
        // 10 ms margin so rate-ratio truncation never comes up short.
        let needed_raw = (config.duration_secs * self.capture_rate as f32).ceil() as usize
            + self.capture_rate as usize / 100;

        self.consumer.clear();
        self.capturing.store(true, Ordering::Release);

        let mut raw: Vec<f32> = Vec::with_capacity(needed_raw);
        let mut scratch = vec![0f32; 2048];
        while raw.len() < needed_raw {
            let n = self.consumer.pop_slice(&mut scratch);
            if n == 0 {
                std::thread::sleep(EMPTY_SLEEP);
                continue;
            }
            let take = (needed_raw - raw.len()).min(n);
            raw.extend_from_slice(&scratch[..take]);
        }

        self.capturing.store(false, Ordering::Release);

        let mut converter = RateConverter::new(self.capture_rate, config.sample_rate)?;
        let mut buffer = SampleBuffer::new(converter.convert_all(&raw), config.sample_rate);
        buffer.clip_to(config.duration_secs);
        Ok(buffer)
    }
}
