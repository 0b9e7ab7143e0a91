//! Default configuration constants for wakestream.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech models and the rate both the VAD and
/// wake-word model families are trained at. The pipeline assumes a single
/// fixed rate established upstream; resampling is out of scope.
pub const SAMPLE_RATE: u32 = 16000;

/// Default ring buffer capacity in samples.
///
/// One second at 16kHz. Large enough to hold the biggest consumer window
/// (1280 samples) plus generous jitter margin for irregular capture batches.
pub const RING_CAPACITY: usize = 16000;

/// VAD analysis window size in samples (32ms at 16kHz).
pub const VAD_WINDOW_SIZE: usize = 512;

/// Number of trailing samples carried between VAD windows.
///
/// The model expects a short run-in of the previous window prepended to each
/// new one, so windows overlap at the feature level without re-reading audio.
pub const VAD_CONTEXT_SIZE: usize = 64;

/// VAD recurrent state shape, as `[layers, batch, hidden]`.
pub const VAD_STATE_SHAPE: [usize; 3] = [2, 1, 128];

/// Default VAD detection threshold.
///
/// Per-window speech probabilities above this count as speech. 0.5 matches
/// the operating point the model is calibrated for.
pub const VAD_THRESHOLD: f32 = 0.5;

/// Default VAD hangover in windows.
///
/// Raw per-window scores are noisy at window boundaries; keeping the detector
/// active for this many sub-threshold windows debounces brief dips so a
/// single quiet window does not fragment an utterance. 12 windows ≈ 384ms.
pub const VAD_HANGOVER_FRAMES: u32 = 12;

/// Wake-word analysis window size in samples (80ms at 16kHz).
pub const WAKEWORD_WINDOW_SIZE: usize = 1280;

/// Number of mel bins per feature frame.
pub const MEL_BINS: usize = 32;

/// Mel frames produced per 80ms window.
pub const MEL_FRAMES_PER_CHUNK: usize = 5;

/// Mel frames consumed per embedding computation.
pub const REQUIRED_MEL_FRAMES: usize = 76;

/// Mel frames discarded after each embedding computation.
///
/// The hop of the sliding feature window, independent of the window length.
pub const MEL_STRIDE: usize = 8;

/// Default embedding vector width.
///
/// Used as the probe fallback when a model declares no usable metadata.
pub const EMBEDDING_DIM: usize = 96;

/// Default classifier input depth in embedding vectors.
///
/// Used as the probe fallback when a model declares no usable metadata.
pub const EMBEDDING_BUFFER_SIZE: usize = 16;

/// Default wake-word detection threshold.
pub const WAKEWORD_THRESHOLD: f32 = 0.5;

/// Candidate classifier input depths tried by the empirical dimension probe,
/// in order.
pub const PROBE_CANDIDATE_SIZES: [usize; 5] = [16, 20, 24, 28, 32];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vad_context_shorter_than_window() {
        assert!(VAD_CONTEXT_SIZE < VAD_WINDOW_SIZE);
    }

    #[test]
    fn ring_capacity_covers_largest_window() {
        assert!(RING_CAPACITY >= WAKEWORD_WINDOW_SIZE * 2);
    }

    #[test]
    fn mel_stride_within_window() {
        assert!(MEL_STRIDE < REQUIRED_MEL_FRAMES);
    }
}
