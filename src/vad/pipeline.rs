//! Voice-activity detection pipeline.
//!
//! Wraps a recurrent speech-probability model in a hysteresis state machine.
//! Each call consumes one fixed-size window plus the carried state — the
//! model's recurrent tensor, a short run of context samples, and the hangover
//! counter — and returns a fresh state value. State is never mutated in
//! place, so a buffer handed to the engine can never alias the caller's copy.

use crate::defaults;
use crate::engine::{take_f32, InferenceEngine, TensorMap, TensorValue};
use crate::error::{Result, WakestreamError};
use ndarray::ArrayD;

/// Engine tensor names for the recurrent VAD graph.
const INPUT: &str = "input";
const STATE: &str = "state";
const SAMPLE_RATE: &str = "sr";
const OUTPUT: &str = "output";
const STATE_OUT: &str = "stateN";

/// Configuration for the VAD pipeline.
#[derive(Debug, Clone, Copy)]
pub struct VadConfig {
    /// Speech-probability threshold (0.0 to 1.0).
    pub threshold: f32,
    /// Sub-threshold windows tolerated before speech is considered ended.
    pub hangover_frames: u32,
    /// Sample rate in Hz, forwarded to the model.
    pub sample_rate: u32,
    /// Analysis window size in samples.
    pub window_size: usize,
    /// Trailing samples of the previous window prepended to each input.
    pub context_size: usize,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::VAD_THRESHOLD,
            hangover_frames: defaults::VAD_HANGOVER_FRAMES,
            sample_rate: defaults::SAMPLE_RATE,
            window_size: defaults::VAD_WINDOW_SIZE,
            context_size: defaults::VAD_CONTEXT_SIZE,
        }
    }
}

/// Carried VAD state, threaded through every `process` call.
#[derive(Debug, Clone)]
pub struct VadState {
    /// Model recurrent state, `[layers, batch, hidden]`.
    recurrent: ArrayD<f32>,
    /// Last `context_size` samples of the previous window.
    context: Vec<f32>,
    /// Remaining sub-threshold windows before speech ends.
    hangover: u32,
    /// Hysteresis output: whether an utterance is in progress.
    speech_active: bool,
}

impl VadState {
    /// Creates the zero state for the start of a stream.
    pub fn new(config: &VadConfig) -> Self {
        Self {
            recurrent: ArrayD::zeros(ndarray::IxDyn(&defaults::VAD_STATE_SHAPE)),
            context: vec![0.0; config.context_size],
            hangover: 0,
            speech_active: false,
        }
    }

    /// Whether an utterance is currently in progress.
    pub fn speech_active(&self) -> bool {
        self.speech_active
    }

    /// Remaining hangover windows.
    pub fn hangover(&self) -> u32 {
        self.hangover
    }
}

/// Result of one VAD window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadDecision {
    /// Raw model probability for this window.
    pub score: f32,
    /// Whether this window alone crossed the threshold.
    pub detected: bool,
    /// Hysteresis output after this window.
    pub speech_active: bool,
}

/// Voice-activity detection pipeline over an injected inference engine.
pub struct VadPipeline<E: InferenceEngine> {
    engine: E,
    config: VadConfig,
}

impl<E: InferenceEngine> VadPipeline<E> {
    /// Creates a pipeline around an engine handle.
    pub fn new(engine: E, config: VadConfig) -> Self {
        Self { engine, config }
    }

    /// Returns the pipeline configuration.
    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    /// Creates the initial state for this pipeline's geometry.
    pub fn initial_state(&self) -> VadState {
        VadState::new(&self.config)
    }

    /// Processes one window against the carried state.
    ///
    /// Returns the decision and the successor state. Engine failures
    /// propagate unchanged; there is no retry, because replaying a window
    /// against a recurrent model would desynchronize the stream.
    pub fn process(&mut self, state: &VadState, window: &[f32]) -> Result<(VadDecision, VadState)> {
        if window.len() != self.config.window_size {
            return Err(WakestreamError::WindowLength {
                expected: self.config.window_size,
                actual: window.len(),
            });
        }
        if state.context.len() != self.config.context_size {
            return Err(WakestreamError::InvalidState {
                message: format!(
                    "context holds {} samples, expected {}",
                    state.context.len(),
                    self.config.context_size
                ),
            });
        }

        let mut samples = Vec::with_capacity(self.config.context_size + window.len());
        samples.extend_from_slice(&state.context);
        samples.extend_from_slice(window);
        let input = TensorValue::from_f32(&[1, samples.len()], samples)?;

        let mut inputs = TensorMap::new();
        inputs.insert(INPUT.to_string(), input);
        inputs.insert(STATE.to_string(), TensorValue::F32(state.recurrent.clone()));
        inputs.insert(
            SAMPLE_RATE.to_string(),
            TensorValue::scalar_i64(self.config.sample_rate as i64),
        );

        let mut outputs = self.engine.run(inputs)?;
        let score_tensor = take_f32(&mut outputs, OUTPUT)?;
        let score = score_tensor
            .iter()
            .next()
            .copied()
            .ok_or_else(|| WakestreamError::Inference {
                message: "empty score tensor".to_string(),
            })?;
        let recurrent = take_f32(&mut outputs, STATE_OUT)?;

        let detected = score > self.config.threshold;
        let mut speech_active = state.speech_active;
        let mut hangover = state.hangover;
        if detected {
            speech_active = true;
            hangover = self.config.hangover_frames;
        } else if speech_active {
            // The counter drains to zero while speech stays active; the flip
            // happens on the first sub-threshold window after exhaustion.
            if hangover > 0 {
                hangover -= 1;
            } else {
                speech_active = false;
            }
        }

        let context = window[window.len() - self.config.context_size..].to_vec();

        let decision = VadDecision {
            score,
            detected,
            speech_active,
        };
        let next = VadState {
            recurrent,
            context,
            hangover,
            speech_active,
        };
        Ok((decision, next))
    }
}
