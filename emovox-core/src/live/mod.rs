//! Live detection loop.
//!
//! ```text
//!  Idle ──▶ Recording ──▶ Validating ──▶ Predicting ──▶ Reporting ──▶ Pausing
//!              ▲              │                │                         │
//!              │   silence    │     error      ▼                         │
//!              ├──────────────┘     (logged, skipped) ──▶ Pausing        │
//!              └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design
//!
//! The loop runs on one blocking thread; [`CaptureSource::record`] blocks
//! until a full window is in hand, so there is nothing to poll. Silent
//! recordings go straight back to `Recording` without the inter-prediction
//! pause. Cancellation is cooperative: the flag is read at state
//! boundaries, never mid-recording, so a window in flight always finishes.
//!
//! Time and audio are both behind traits ([`Clock`], [`CaptureSource`]) so
//! the loop is testable without a microphone or real sleeps.

pub mod history;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::{AudioConfig, CaptureSource, SampleBuffer};
use crate::error::Result;
use crate::predict::{PredictionResult, Predictor};

pub use history::PredictionHistory;

/// Sleep abstraction so tests can run the loop without real delays.
pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock implementation.
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Live loop parameters.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub audio: AudioConfig,
    /// Peak amplitude below which a recording is treated as silence.
    pub silence_threshold: f32,
    /// Pause between a reported prediction and the next recording.
    pub pause_between: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            silence_threshold: 0.01,
            pause_between: Duration::from_secs(2),
        }
    }
}

enum LoopState {
    Idle,
    Recording,
    Validating(SampleBuffer),
    Predicting(SampleBuffer),
    Reporting(PredictionResult),
    Pausing,
}

/// Drives record → validate → predict → report cycles over a capture
/// source, keeping a short history of results.
pub struct LiveDetector {
    predictor: Predictor,
    source: Box<dyn CaptureSource>,
    clock: Box<dyn Clock>,
    config: LiveConfig,
    history: PredictionHistory,
    cancel: Arc<AtomicBool>,
}

impl LiveDetector {
    pub fn new(predictor: Predictor, source: Box<dyn CaptureSource>, config: LiveConfig) -> Self {
        Self::with_clock(predictor, source, Box::new(SystemClock), config)
    }

    pub fn with_clock(
        predictor: Predictor,
        source: Box<dyn CaptureSource>,
        clock: Box<dyn Clock>,
        config: LiveConfig,
    ) -> Self {
        Self {
            predictor,
            source,
            clock,
            config,
            history: PredictionHistory::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops `run_continuous` at the next state boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn history(&self) -> &PredictionHistory {
        &self.history
    }

    /// One record → validate → predict pass.
    ///
    /// Returns `Ok(None)` when the recording was below the silence
    /// threshold; otherwise the prediction is pushed to the history and
    /// returned.
    pub fn run_single(&mut self) -> Result<Option<PredictionResult>> {
        info!(duration = self.config.audio.duration_secs, "recording");
        let buffer = self.source.record(&self.config.audio)?;

        let peak = buffer.peak();
        if peak < self.config.silence_threshold {
            warn!(peak, "recording below silence threshold");
            return Ok(None);
        }

        let result = self.predictor.predict_samples(&buffer)?;
        self.history.push(result.clone());
        Ok(Some(result))
    }

    /// Run record/predict cycles until the cancel flag is raised.
    ///
    /// `on_result` is invoked once per successful prediction with the
    /// result and the updated history. Prediction failures are logged and
    /// the loop proceeds to the pause; capture failures abort the loop.
    pub fn run_continuous<F>(&mut self, mut on_result: F) -> Result<()>
    where
        F: FnMut(&PredictionResult, &PredictionHistory),
    {
        let mut state = LoopState::Idle;

        loop {
            state = match state {
                LoopState::Idle => {
                    info!(
                        threshold = self.config.silence_threshold,
                        pause_secs = self.config.pause_between.as_secs_f32(),
                        "live loop starting"
                    );
                    LoopState::Recording
                }
                LoopState::Recording => {
                    if self.cancelled() {
                        break;
                    }
                    debug!("recording window");
                    LoopState::Validating(self.source.record(&self.config.audio)?)
                }
                LoopState::Validating(buffer) => {
                    let peak = buffer.peak();
                    if peak < self.config.silence_threshold {
                        debug!(peak, "silent window, re-recording");
                        if self.cancelled() {
                            break;
                        }
                        LoopState::Recording
                    } else {
                        LoopState::Predicting(buffer)
                    }
                }
                LoopState::Predicting(buffer) => {
                    match self.predictor.predict_samples(&buffer) {
                        Ok(result) => LoopState::Reporting(result),
                        Err(e) => {
                            warn!(error = %e, "prediction failed, skipping window");
                            LoopState::Pausing
                        }
                    }
                }
                LoopState::Reporting(result) => {
                    self.history.push(result.clone());
                    on_result(&result, &self.history);
                    LoopState::Pausing
                }
                LoopState::Pausing => {
                    if self.cancelled() {
                        break;
                    }
                    self.clock.sleep(self.config.pause_between);
                    LoopState::Recording
                }
            };
        }

        info!(predictions = self.history.len(), "live loop stopped");
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmovoxError;
    use crate::features::BASE_FEATURES;
    use crate::model::{ClassifierModel, FeatureScaler, ModelArtifact};
    use std::collections::VecDeque;
    use std::f32::consts::PI;

    struct FixedModel {
        class_id: i64,
        classes: Vec<i64>,
    }

    impl ClassifierModel for FixedModel {
        fn predict(&self, _features: &[f64]) -> i64 {
            self.class_id
        }
        fn predict_proba(&self, _features: &[f64]) -> Option<Vec<f64>> {
            None
        }
        fn classes(&self) -> &[i64] {
            &self.classes
        }
    }

    /// Scripted capture source; raises the cancel flag when the script is
    /// exhausted so the loop terminates deterministically.
    struct ScriptedSource {
        buffers: VecDeque<SampleBuffer>,
        cancel: Arc<AtomicBool>,
    }

    impl CaptureSource for ScriptedSource {
        fn record(&mut self, _config: &AudioConfig) -> Result<SampleBuffer> {
            let buffer = self
                .buffers
                .pop_front()
                .ok_or_else(|| EmovoxError::AudioStream("script exhausted".into()))?;
            if self.buffers.is_empty() {
                self.cancel.store(true, Ordering::SeqCst);
            }
            Ok(buffer)
        }
    }

    struct FakeClock {
        sleeps: Arc<std::sync::Mutex<Vec<Duration>>>,
    }

    impl Clock for FakeClock {
        fn sleep(&mut self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn loud() -> SampleBuffer {
        let samples: Vec<f32> = (0..22_050)
            .map(|i| 0.5 * (2.0 * PI * 300.0 * i as f32 / 22_050.0).sin())
            .collect();
        SampleBuffer::new(samples, 22_050)
    }

    fn silent() -> SampleBuffer {
        SampleBuffer::new(vec![0.0; 22_050], 22_050)
    }

    fn predictor() -> Predictor {
        let scaler = FeatureScaler {
            mean: vec![0.0; BASE_FEATURES],
            scale: vec![1.0; BASE_FEATURES],
        };
        let artifact = ModelArtifact::from_parts(
            scaler,
            Box::new(FixedModel {
                class_id: 3,
                classes: vec![3],
            }),
        );
        Predictor::new(artifact, AudioConfig::default())
    }

    fn detector(
        buffers: Vec<SampleBuffer>,
    ) -> (LiveDetector, Arc<std::sync::Mutex<Vec<Duration>>>) {
        let sleeps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let clock = FakeClock {
            sleeps: Arc::clone(&sleeps),
        };

        // Wire the script's exhaustion to the detector's cancel flag.
        let cancel = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource {
            buffers: buffers.into(),
            cancel: Arc::clone(&cancel),
        };

        let mut det = LiveDetector::with_clock(
            predictor(),
            Box::new(source),
            Box::new(clock),
            LiveConfig::default(),
        );
        det.cancel = cancel;
        (det, sleeps)
    }

    #[test]
    fn single_pass_rejects_silence() {
        let (mut det, _) = detector(vec![silent(), loud()]);

        assert!(det.run_single().unwrap().is_none());
        assert!(det.history().is_empty());

        let result = det.run_single().unwrap().unwrap();
        assert_eq!(result.emotion, crate::model::Emotion::Happy);
        assert_eq!(det.history().len(), 1);
    }

    #[test]
    fn continuous_loop_skips_silence_without_pausing() {
        // loud → (pause) → silent (no pause) → loud → cancel raised
        let (mut det, sleeps) = detector(vec![loud(), silent(), loud()]);

        let mut reported = 0;
        det.run_continuous(|result, history| {
            assert_eq!(result.emotion, crate::model::Emotion::Happy);
            assert_eq!(history.latest().unwrap().emotion, result.emotion);
            reported += 1;
        })
        .unwrap();

        assert_eq!(reported, 2);
        assert_eq!(det.history().len(), 2);
        // One pause after the first report; the silent window re-records
        // immediately and the final pause is pre-empted by cancellation.
        let sleeps = sleeps.lock().unwrap();
        assert_eq!(sleeps.as_slice(), &[Duration::from_secs(2)]);
    }

    #[test]
    fn pre_cancelled_loop_records_nothing() {
        let (mut det, sleeps) = detector(vec![loud()]);
        det.cancel_flag().store(true, Ordering::SeqCst);

        let mut reported = 0;
        det.run_continuous(|_, _| reported += 1).unwrap();

        assert_eq!(reported, 0);
        assert!(det.history().is_empty());
        assert!(sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn capture_failure_aborts_the_loop() {
        // Empty script: the first record call fails.
        let sleeps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let source = ScriptedSource {
            buffers: VecDeque::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        };
        let mut det = LiveDetector::with_clock(
            predictor(),
            Box::new(source),
            Box::new(FakeClock {
                sleeps: Arc::clone(&sleeps),
            }),
            LiveConfig::default(),
        );

        let err = det.run_continuous(|_, _| {}).expect_err("must fail");
        assert!(matches!(err, EmovoxError::AudioStream(_)));
    }
}
