//! Streaming voice-activity detection.

pub mod pipeline;

pub use pipeline::{VadConfig, VadDecision, VadPipeline, VadState};
