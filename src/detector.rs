//! Detector composition root.
//!
//! Wires the streaming layer to both detector pipelines:
//!
//! ```text
//! push_samples ──▶ RingBuffer ──▶ MultiChannelChunker ──┬─▶ VadPipeline
//! (any batch size)                 "vad"      @ 512     │     ├─ SpeechStart
//!                                  "wakeword" @ 1280    │     └─ SpeechEnd
//!                                                       └─▶ WakewordPipeline
//!                                                             └─ WakewordTriggered
//! ```
//!
//! The core is synchronous and caller-driven; [`Detector::run`] is an
//! optional wrapper for callers that feed audio through a channel from a
//! capture task. Pipeline states are threaded functionally inside — the
//! detector is the "caller" the pipelines hand successor states back to,
//! and it implements the reset-on-trigger policy.

use crate::defaults;
use crate::engine::InferenceEngine;
use crate::error::Result;
use crate::streaming::{MultiChannelChunker, RingBuffer, RingBufferStats};
use crate::vad::{VadConfig, VadPipeline, VadState};
use crate::wakeword::{WakewordConfig, WakewordModel, WakewordPipeline, WakewordState};
use tokio::sync::mpsc;

/// Channel name for the VAD consumer.
pub const VAD_CHANNEL: &str = "vad";
/// Channel name for the wake-word consumer.
pub const WAKEWORD_CHANNEL: &str = "wakeword";

/// Events emitted by the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionEvent {
    /// Voice activity began.
    SpeechStart,
    /// Voice activity ended (hangover expired).
    SpeechEnd,
    /// The wake word was detected.
    WakewordTriggered { score: f32 },
}

/// Per-window telemetry hook.
///
/// Injected explicitly rather than published on a global bus; the default
/// implementations make every callback optional.
pub trait DetectionObserver: Send {
    /// Called with every VAD window's raw score.
    fn on_vad_score(&self, _score: f32) {}
    /// Called with every wake-word window's score.
    fn on_wakeword_score(&self, _score: f32) {}
    /// Called for every emitted event.
    fn on_event(&self, _event: DetectionEvent) {}
}

/// Observer that logs events to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl DetectionObserver for LogObserver {
    fn on_event(&self, event: DetectionEvent) {
        eprintln!("[detector] {:?}", event);
    }
}

/// Configuration for the detector composition.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Ring buffer capacity in samples.
    pub ring_capacity: usize,
    /// VAD pipeline configuration.
    pub vad: VadConfig,
    /// Wake-word pipeline configuration.
    pub wakeword: WakewordConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            ring_capacity: defaults::RING_CAPACITY,
            vad: VadConfig::default(),
            wakeword: WakewordConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Creates configuration from app config.
    pub fn from_config(config: &crate::config::Config) -> Self {
        let mut detector_config = Self::default();
        detector_config.ring_capacity = config.audio.ring_capacity;
        detector_config.vad.threshold = config.vad.threshold;
        detector_config.vad.hangover_frames = config.vad.hangover_frames;
        detector_config.vad.sample_rate = config.audio.sample_rate;
        detector_config.wakeword.threshold = config.wakeword.threshold;
        detector_config
    }
}

/// Streaming detector over one audio stream.
///
/// Owns its buffers, pipelines and carried states; two detectors never share
/// state, so separate instances can run on separate tasks freely.
pub struct Detector {
    ring: RingBuffer,
    chunkers: MultiChannelChunker,
    vad: VadPipeline<Box<dyn InferenceEngine>>,
    vad_state: VadState,
    wakeword: WakewordPipeline,
    wakeword_state: WakewordState,
    observer: Option<Box<dyn DetectionObserver>>,
}

impl Detector {
    /// Builds a detector from engine handles and configuration.
    ///
    /// The wake-word model's dimensions are probed here, once.
    pub fn new(
        vad_engine: Box<dyn InferenceEngine>,
        model: WakewordModel,
        config: DetectorConfig,
    ) -> Result<Self> {
        let mut chunkers = MultiChannelChunker::new();
        chunkers.register_channel(VAD_CHANNEL, config.vad.window_size, 0)?;
        chunkers.register_channel(WAKEWORD_CHANNEL, config.wakeword.window_size, 0)?;

        let vad = VadPipeline::new(vad_engine, config.vad);
        let wakeword = WakewordPipeline::new(model, config.wakeword)?;
        let vad_state = vad.initial_state();
        let wakeword_state = wakeword.initial_state();

        Ok(Self {
            ring: RingBuffer::new(config.ring_capacity),
            chunkers,
            vad,
            vad_state,
            wakeword,
            wakeword_state,
            observer: None,
        })
    }

    /// Attaches a telemetry observer.
    pub fn with_observer(mut self, observer: Box<dyn DetectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Feeds captured samples and runs every detector window they complete.
    ///
    /// Accepts any batch size; the streaming layer guarantees the emitted
    /// windows are independent of how the caller batches input. Returns the
    /// events this batch produced, in stream order per detector.
    pub fn push_samples(&mut self, samples: &[f32]) -> Result<Vec<DetectionEvent>> {
        self.ring.write(samples);
        let Some(drained) = self.ring.read(self.ring.available()) else {
            return Ok(Vec::new());
        };

        let windows = self.chunkers.process(&drained);
        let mut events = Vec::new();

        if let Some(vad_windows) = windows.get(VAD_CHANNEL) {
            for window in vad_windows {
                let was_active = self.vad_state.speech_active();
                let (decision, next) = self.vad.process(&self.vad_state, window)?;
                self.vad_state = next;

                if let Some(observer) = &self.observer {
                    observer.on_vad_score(decision.score);
                }
                if !was_active && decision.speech_active {
                    self.emit(&mut events, DetectionEvent::SpeechStart);
                } else if was_active && !decision.speech_active {
                    self.emit(&mut events, DetectionEvent::SpeechEnd);
                }
            }
        }

        if let Some(wakeword_windows) = windows.get(WAKEWORD_CHANNEL) {
            for window in wakeword_windows {
                let (decision, next) = self.wakeword.process(&self.wakeword_state, window)?;

                if let Some(observer) = &self.observer {
                    observer.on_wakeword_score(decision.score);
                }
                if decision.triggered {
                    self.emit(
                        &mut events,
                        DetectionEvent::WakewordTriggered {
                            score: decision.score,
                        },
                    );
                    // Restart from scratch so the same utterance cannot
                    // re-trigger on the next window
                    self.wakeword_state = self.wakeword.initial_state();
                } else {
                    self.wakeword_state = next;
                }
            }
        }

        Ok(events)
    }

    fn emit(&self, events: &mut Vec<DetectionEvent>, event: DetectionEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(event);
        }
        events.push(event);
    }

    /// Whether an utterance is currently in progress.
    pub fn speech_active(&self) -> bool {
        self.vad_state.speech_active()
    }

    /// Diagnostic snapshot of the ring buffer.
    pub fn ring_stats(&self) -> RingBufferStats {
        self.ring.stats()
    }

    /// Drops all buffered audio and restarts both pipelines' states.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.chunkers.reset_all();
        self.vad_state = self.vad.initial_state();
        self.wakeword_state = self.wakeword.initial_state();
    }

    /// Runs the detector as a station: audio batches in, events out.
    ///
    /// Returns when the input channel closes, the event receiver is
    /// dropped, or a pipeline error occurs. Spawn it on a task; the
    /// detector itself starts no threads.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<Vec<f32>>,
        output: mpsc::Sender<DetectionEvent>,
    ) {
        while let Some(samples) = input.recv().await {
            match self.push_samples(&samples) {
                Ok(events) => {
                    for event in events {
                        if output.send(event).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    eprintln!("[detector] {}", err);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockEngine, TensorSpec, TensorValue};
    use crate::wakeword::ModelDims;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn vad_engine(scores: Vec<f32>) -> Box<dyn InferenceEngine> {
        Box::new(
            MockEngine::new()
                .with_scores("output", &[1, 1], scores)
                .with_echo("stateN", "state"),
        )
    }

    fn three_stage_model(detector_scores: Vec<f32>) -> WakewordModel {
        let melspec = MockEngine::new().with_output(
            "melspectrogram",
            TensorValue::from_f32(&[1, 1, 5, 32], vec![0.0; 160]).unwrap(),
        );
        let embedding = MockEngine::new()
            .with_output(
                "embedding",
                TensorValue::from_f32(&[1, 96], vec![0.0; 96]).unwrap(),
            )
            .with_output_specs(vec![TensorSpec::new("embedding", vec![Some(1), Some(96)])]);
        let detector = MockEngine::new()
            .with_scores("scores", &[1, 1], detector_scores)
            .with_input_specs(vec![TensorSpec::new(
                "embeddings",
                vec![Some(1), Some(16), Some(96)],
            )]);
        WakewordModel::ThreeStage {
            melspec: Box::new(melspec),
            embedding: Box::new(embedding),
            detector: Box::new(detector),
        }
    }

    fn quiet_model() -> WakewordModel {
        three_stage_model(vec![0.0])
    }

    struct CountingObserver {
        vad_scores: Arc<AtomicUsize>,
        events: Arc<AtomicUsize>,
    }

    impl DetectionObserver for CountingObserver {
        fn on_vad_score(&self, _score: f32) {
            self.vad_scores.fetch_add(1, Ordering::SeqCst);
        }

        fn on_event(&self, _event: DetectionEvent) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_speech_start_event_on_first_hot_window() {
        let mut detector =
            Detector::new(vad_engine(vec![0.9]), quiet_model(), DetectorConfig::default()).unwrap();

        // One full VAD window, not yet a wake-word window
        let events = detector.push_samples(&vec![0.0; 512]).unwrap();
        assert_eq!(events, vec![DetectionEvent::SpeechStart]);
        assert!(detector.speech_active());
    }

    #[test]
    fn test_speech_end_after_hangover() {
        let config = DetectorConfig {
            vad: VadConfig {
                hangover_frames: 2,
                ..VadConfig::default()
            },
            ..DetectorConfig::default()
        };
        let scores = vec![0.9, 0.1, 0.1, 0.1];
        let mut detector = Detector::new(vad_engine(scores), quiet_model(), config).unwrap();

        let events = detector.push_samples(&vec![0.0; 512]).unwrap();
        assert_eq!(events, vec![DetectionEvent::SpeechStart]);

        // Two quiet windows ride the hangover, the third flips
        assert!(detector.push_samples(&vec![0.0; 512]).unwrap().is_empty());
        assert!(detector.push_samples(&vec![0.0; 512]).unwrap().is_empty());
        let events = detector.push_samples(&vec![0.0; 512]).unwrap();
        assert_eq!(events, vec![DetectionEvent::SpeechEnd]);
        assert!(!detector.speech_active());
    }

    #[test]
    fn test_wakeword_trigger_resets_pipeline_state() {
        let mut detector = Detector::new(
            vad_engine(vec![0.0]),
            three_stage_model(vec![0.9]),
            DetectorConfig::default(),
        )
        .unwrap();

        // 16 wake-word windows complete warm-up (15 warm-up + 1 live)
        let mut triggers = 0;
        for _ in 0..16 {
            for event in detector.push_samples(&vec![0.0; 1280]).unwrap() {
                if matches!(event, DetectionEvent::WakewordTriggered { .. }) {
                    triggers += 1;
                }
            }
        }
        assert_eq!(triggers, 1);

        // State was reset on trigger: the next window is warming up again
        let events = detector.push_samples(&vec![0.0; 1280]).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_batch_size_does_not_change_event_stream() {
        let run = |batch: usize| -> Vec<DetectionEvent> {
            let mut detector = Detector::new(
                vad_engine(vec![0.9]),
                quiet_model(),
                DetectorConfig::default(),
            )
            .unwrap();
            let mut events = Vec::new();
            let mut fed = 0;
            while fed < 4096 {
                let n = batch.min(4096 - fed);
                events.extend(detector.push_samples(&vec![0.0; n]).unwrap());
                fed += n;
            }
            events
        };

        let reference = run(4096);
        assert_eq!(run(1), reference);
        assert_eq!(run(160), reference);
        assert_eq!(run(512), reference);
        assert_eq!(run(1000), reference);
    }

    #[test]
    fn test_partial_windows_wait_in_remainder() {
        let mut detector =
            Detector::new(vad_engine(vec![0.0]), quiet_model(), DetectorConfig::default()).unwrap();

        assert!(detector.push_samples(&vec![0.0; 500]).unwrap().is_empty());
        // Nothing left in the ring; the partial window lives in the chunkers
        assert_eq!(detector.ring_stats().size, 0);
        assert_eq!(
            detector
                .chunkers
                .channel(VAD_CHANNEL)
                .unwrap()
                .remainder_len(),
            500
        );
    }

    #[test]
    fn test_observer_sees_scores_and_events() {
        let vad_scores = Arc::new(AtomicUsize::new(0));
        let events = Arc::new(AtomicUsize::new(0));
        let observer = CountingObserver {
            vad_scores: vad_scores.clone(),
            events: events.clone(),
        };

        let mut detector =
            Detector::new(vad_engine(vec![0.9]), quiet_model(), DetectorConfig::default())
                .unwrap()
                .with_observer(Box::new(observer));

        detector.push_samples(&vec![0.0; 1024]).unwrap();
        assert_eq!(vad_scores.load(Ordering::SeqCst), 2);
        assert_eq!(events.load(Ordering::SeqCst), 1); // SpeechStart
    }

    #[test]
    fn test_reset_restarts_everything() {
        let mut detector =
            Detector::new(vad_engine(vec![0.9]), quiet_model(), DetectorConfig::default()).unwrap();
        detector.push_samples(&vec![0.0; 700]).unwrap();
        assert!(detector.speech_active());

        detector.reset();
        assert!(!detector.speech_active());
        assert_eq!(detector.ring_stats().size, 0);
        assert_eq!(
            detector
                .chunkers
                .channel(VAD_CHANNEL)
                .unwrap()
                .remainder_len(),
            0
        );
    }

    #[test]
    fn test_single_stage_model_composes() {
        let engine = MockEngine::new().with_scores("scores", &[1, 1], vec![0.9]);
        let model = WakewordModel::SingleStage {
            detector: Box::new(engine),
        };
        let config = DetectorConfig {
            wakeword: WakewordConfig {
                fallback_dims: Some(ModelDims::default()),
                ..WakewordConfig::default()
            },
            ..DetectorConfig::default()
        };
        let mut detector = Detector::new(vad_engine(vec![0.0]), model, config).unwrap();

        // A fused model needs no warm-up
        let events = detector.push_samples(&vec![0.0; 1280]).unwrap();
        assert!(events.contains(&DetectionEvent::WakewordTriggered { score: 0.9 }));
    }

    #[tokio::test]
    async fn test_run_station_forwards_events() {
        let detector =
            Detector::new(vad_engine(vec![0.9]), quiet_model(), DetectorConfig::default()).unwrap();

        let (input_tx, input_rx) = mpsc::channel(10);
        let (output_tx, mut output_rx) = mpsc::channel(10);

        tokio::spawn(async move {
            detector.run(input_rx, output_tx).await;
        });

        input_tx.send(vec![0.0; 512]).await.unwrap();
        let event = output_rx.recv().await.unwrap();
        assert_eq!(event, DetectionEvent::SpeechStart);

        drop(input_tx);
    }
}
