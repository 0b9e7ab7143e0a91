//! Multi-stage streaming wake-word detection.

pub mod dims;
pub mod pipeline;

pub use dims::{probe_model_dims, ModelDims, ShapeHint};
pub use pipeline::{WakewordConfig, WakewordDecision, WakewordModel, WakewordPipeline, WakewordState};
