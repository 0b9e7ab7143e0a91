//! Error types for wakestream.
//!
//! Insufficient buffered data is deliberately *not* represented here: ring
//! buffer reads and chunker output counts are the expected steady-state
//! back-pressure signal, surfaced as `Option`/empty results on the hot path.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WakestreamError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Chunker layer errors
    #[error("Invalid chunker geometry: {message}")]
    ChunkerConfig { message: String },

    #[error("Channel already registered: {name}")]
    DuplicateChannel { name: String },

    #[error("Unknown channel: {name}")]
    UnknownChannel { name: String },

    // Pipeline contract violations
    #[error("Window length mismatch: expected {expected}, got {actual}")]
    WindowLength { expected: usize, actual: usize },

    #[error("Invalid detector state: {message}")]
    InvalidState { message: String },

    // Inference engine boundary
    #[error("Inference failed: {message}")]
    Inference { message: String },

    #[error("Engine output missing tensor: {name}")]
    MissingTensor { name: String },

    #[error("Dimension probe exhausted: {message}")]
    DimensionProbeExhausted { message: String },

    // Model loading
    #[error("Model file not found at {path}")]
    ModelNotFound { path: String },

    #[error("Failed to load model: {message}")]
    ModelLoad { message: String },

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio format mismatch: expected {expected}, got {actual}")]
    AudioFormatMismatch { expected: String, actual: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // WAV file errors
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, WakestreamError>;
