//! wakestream - Streaming voice-activity and wake-word detection core
//!
//! A lossless re-chunking buffer layer plus two stateful detector pipelines
//! (VAD and a three-stage wake-word detector), driven caller-side one window
//! at a time against an injected inference engine. Results are bit-stable
//! across arbitrary input batching.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod detector;
pub mod engine;
pub mod error;
pub mod streaming;
pub mod vad;
pub mod wakeword;

// Core traits (source → buffer → detect)
pub use audio::recorder::AudioSource;
pub use engine::{InferenceEngine, MockEngine, TensorMap, TensorSpec, TensorValue};

// Detector composition
pub use detector::{DetectionEvent, DetectionObserver, Detector, DetectorConfig, LogObserver};

// Streaming layer
pub use streaming::{Chunker, MultiChannelChunker, RingBuffer, RingBufferStats};

// Pipelines
pub use vad::{VadConfig, VadDecision, VadPipeline, VadState};
pub use wakeword::{
    probe_model_dims, ModelDims, ShapeHint, WakewordConfig, WakewordDecision, WakewordModel,
    WakewordPipeline, WakewordState,
};

// Error handling
pub use error::{Result, WakestreamError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.1+abc1234"` when git hash is available, `"0.3.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
