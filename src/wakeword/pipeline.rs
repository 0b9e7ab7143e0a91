//! Three-stage wake-word detection pipeline.
//!
//! Per 80ms window: melspectrogram features → pooled embedding → classifier
//! score. Two sliding buffers bridge the stages — a mel-frame accumulator
//! that fills during warm-up and then hops forward by a fixed stride, and a
//! fixed-depth FIFO of the most recent embeddings that forms the classifier
//! input. Both live in [`WakewordState`], threaded functionally through
//! every call; the pipeline owns the engines, the caller owns the state.
//!
//! Single-file models that fuse all three stages are a distinct
//! [`WakewordModel::SingleStage`] variant chosen at construction, not a
//! runtime fallback.

use crate::defaults;
use crate::engine::{take_single_f32, InferenceEngine, TensorMap, TensorValue};
use crate::error::{Result, WakestreamError};
use crate::wakeword::dims::{probe_model_dims, ModelDims};
use std::collections::VecDeque;

const INPUT: &str = "input";

/// Configuration for the wake-word pipeline.
#[derive(Debug, Clone, Copy)]
pub struct WakewordConfig {
    /// Detection threshold on the classifier score (0.0 to 1.0).
    pub threshold: f32,
    /// Analysis window size in samples.
    pub window_size: usize,
    /// Mel bins per feature frame.
    pub mel_bins: usize,
    /// Mel frames consumed per embedding computation.
    pub required_mel_frames: usize,
    /// Mel frames discarded after each embedding computation.
    pub mel_stride: usize,
    /// Dimension-probe fallback when a model declares no usable metadata.
    pub fallback_dims: Option<ModelDims>,
}

impl Default for WakewordConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::WAKEWORD_THRESHOLD,
            window_size: defaults::WAKEWORD_WINDOW_SIZE,
            mel_bins: defaults::MEL_BINS,
            required_mel_frames: defaults::REQUIRED_MEL_FRAMES,
            mel_stride: defaults::MEL_STRIDE,
            fallback_dims: Some(ModelDims::default()),
        }
    }
}

/// Carried wake-word state: the two sliding buffers between stages.
#[derive(Debug, Clone, PartialEq)]
pub struct WakewordState {
    /// Accumulated mel feature frames, oldest first.
    mel_buffer: VecDeque<Vec<f32>>,
    /// Fixed-depth FIFO of recent embeddings, oldest first.
    embedding_buffer: VecDeque<Vec<f32>>,
}

impl WakewordState {
    /// Creates the warm-up state: no mel frames, zero embeddings.
    pub fn new(dims: &ModelDims) -> Self {
        let embedding_buffer = (0..dims.embedding_buffer_size)
            .map(|_| vec![0.0; dims.embedding_dimension])
            .collect();
        Self {
            mel_buffer: VecDeque::new(),
            embedding_buffer,
        }
    }

    /// Buffered mel frame count.
    pub fn mel_frames(&self) -> usize {
        self.mel_buffer.len()
    }
}

/// The engines backing a wake-word model.
///
/// Most exports split the pipeline into three graphs; some single-file
/// custom models fuse everything into one graph consuming raw audio. The
/// two layouts behave differently enough that the distinction is a type,
/// selected when the model is loaded.
pub enum WakewordModel {
    /// Separate melspectrogram, embedding and classifier graphs.
    ThreeStage {
        melspec: Box<dyn InferenceEngine>,
        embedding: Box<dyn InferenceEngine>,
        detector: Box<dyn InferenceEngine>,
    },
    /// One fused graph consuming raw audio.
    SingleStage { detector: Box<dyn InferenceEngine> },
}

/// Result of one wake-word window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakewordDecision {
    /// Classifier score for this window (0.0 during warm-up).
    pub score: f32,
    /// Whether the score crossed the threshold.
    pub triggered: bool,
}

/// Wake-word detection pipeline over injected engine handles.
pub struct WakewordPipeline {
    model: WakewordModel,
    config: WakewordConfig,
    dims: ModelDims,
}

impl WakewordPipeline {
    /// Builds the pipeline, probing the model's embedding geometry once.
    ///
    /// Probing happens here — at model-load time — so the per-window path
    /// never touches metadata or error-text parsing.
    pub fn new(model: WakewordModel, config: WakewordConfig) -> Result<Self> {
        let mut model = model;
        let dims = match &mut model {
            WakewordModel::ThreeStage {
                embedding, detector, ..
            } => probe_model_dims(embedding.as_ref(), detector.as_mut(), config.fallback_dims)?,
            WakewordModel::SingleStage { .. } => config.fallback_dims.unwrap_or_default(),
        };
        Ok(Self {
            model,
            config,
            dims,
        })
    }

    /// Returns the probed model geometry.
    pub fn dims(&self) -> ModelDims {
        self.dims
    }

    /// Returns the pipeline configuration.
    pub fn config(&self) -> &WakewordConfig {
        &self.config
    }

    /// Creates the initial (warm-up) state for this model.
    pub fn initial_state(&self) -> WakewordState {
        WakewordState::new(&self.dims)
    }

    /// Processes one window against the carried state.
    ///
    /// During warm-up — fewer than `required_mel_frames` buffered — the
    /// embedding and classifier stages are skipped and the score is 0.0;
    /// that is expected steady-state behavior, not an error. On
    /// `triggered`, the caller is expected to restart from
    /// [`initial_state`](Self::initial_state) to avoid re-triggering on the
    /// same utterance.
    pub fn process(
        &mut self,
        state: &WakewordState,
        window: &[f32],
    ) -> Result<(WakewordDecision, WakewordState)> {
        if window.len() != self.config.window_size {
            return Err(WakestreamError::WindowLength {
                expected: self.config.window_size,
                actual: window.len(),
            });
        }
        self.check_state(state)?;

        match &mut self.model {
            WakewordModel::SingleStage { detector } => {
                let mut inputs = TensorMap::new();
                inputs.insert(
                    INPUT.to_string(),
                    TensorValue::from_f32(&[1, window.len()], window.to_vec())?,
                );
                let score_tensor = take_single_f32(detector.run(inputs)?)?;
                let score = score_tensor.iter().next().copied().unwrap_or(0.0);
                let decision = WakewordDecision {
                    score,
                    triggered: score > self.config.threshold,
                };
                Ok((decision, state.clone()))
            }
            WakewordModel::ThreeStage {
                melspec,
                embedding,
                detector,
            } => {
                let mut next = state.clone();

                // Stage 1: raw window → mel frames
                let mut inputs = TensorMap::new();
                inputs.insert(
                    INPUT.to_string(),
                    TensorValue::from_f32(&[1, window.len()], window.to_vec())?,
                );
                let mel = take_single_f32(melspec.run(inputs)?)?;
                let flat: Vec<f32> = mel.iter().copied().collect();
                if flat.is_empty() || flat.len() % self.config.mel_bins != 0 {
                    return Err(WakestreamError::Inference {
                        message: format!(
                            "melspec output of {} values is not a whole number of {}-bin frames",
                            flat.len(),
                            self.config.mel_bins
                        ),
                    });
                }
                for frame in flat.chunks(self.config.mel_bins) {
                    // Rescale fixed by the trained models
                    let frame: Vec<f32> = frame.iter().map(|&v| v / 10.0 + 2.0).collect();
                    next.mel_buffer.push_back(frame);
                }

                let mut score = 0.0;
                if next.mel_buffer.len() >= self.config.required_mel_frames {
                    // Stage 2: oldest mel window → one new embedding
                    let mut mel_window =
                        Vec::with_capacity(self.config.required_mel_frames * self.config.mel_bins);
                    for frame in next.mel_buffer.iter().take(self.config.required_mel_frames) {
                        mel_window.extend_from_slice(frame);
                    }
                    let mut inputs = TensorMap::new();
                    inputs.insert(
                        INPUT.to_string(),
                        TensorValue::from_f32(
                            &[1, self.config.required_mel_frames, self.config.mel_bins, 1],
                            mel_window,
                        )?,
                    );
                    let pooled = take_single_f32(embedding.run(inputs)?)?;
                    let vector: Vec<f32> = pooled.iter().copied().collect();
                    if vector.len() != self.dims.embedding_dimension {
                        return Err(WakestreamError::Inference {
                            message: format!(
                                "embedding of {} values, expected {}",
                                vector.len(),
                                self.dims.embedding_dimension
                            ),
                        });
                    }
                    next.embedding_buffer.pop_front();
                    next.embedding_buffer.push_back(vector);

                    // Stage 3: full embedding FIFO → score
                    let mut stacked = Vec::with_capacity(
                        self.dims.embedding_buffer_size * self.dims.embedding_dimension,
                    );
                    for vector in &next.embedding_buffer {
                        stacked.extend_from_slice(vector);
                    }
                    let mut inputs = TensorMap::new();
                    inputs.insert(
                        INPUT.to_string(),
                        TensorValue::from_f32(
                            &[
                                1,
                                self.dims.embedding_buffer_size,
                                self.dims.embedding_dimension,
                            ],
                            stacked,
                        )?,
                    );
                    let scores = take_single_f32(detector.run(inputs)?)?;
                    score = scores.iter().next().copied().unwrap_or(0.0);

                    // Hop the feature window forward
                    for _ in 0..self.config.mel_stride.min(next.mel_buffer.len()) {
                        next.mel_buffer.pop_front();
                    }
                }

                let decision = WakewordDecision {
                    score,
                    triggered: score > self.config.threshold,
                };
                Ok((decision, next))
            }
        }
    }

    fn check_state(&self, state: &WakewordState) -> Result<()> {
        if state.embedding_buffer.len() != self.dims.embedding_buffer_size {
            return Err(WakestreamError::InvalidState {
                message: format!(
                    "embedding buffer holds {} vectors, expected {}",
                    state.embedding_buffer.len(),
                    self.dims.embedding_buffer_size
                ),
            });
        }
        for vector in &state.embedding_buffer {
            if vector.len() != self.dims.embedding_dimension {
                return Err(WakestreamError::InvalidState {
                    message: format!(
                        "embedding vector of {} values, expected {}",
                        vector.len(),
                        self.dims.embedding_dimension
                    ),
                });
            }
        }
        for frame in &state.mel_buffer {
            if frame.len() != self.config.mel_bins {
                return Err(WakestreamError::InvalidState {
                    message: format!(
                        "mel frame of {} bins, expected {}",
                        frame.len(),
                        self.config.mel_bins
                    ),
                });
            }
        }
        Ok(())
    }
}
