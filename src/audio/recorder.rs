use crate::error::{Result, WakestreamError};

/// Trait for audio source devices.
///
/// This trait allows swapping implementations (real audio device vs mock).
/// Sources deliver mono f32 samples at the fixed stream sample rate, in
/// whatever batch sizes the backend produces — the streaming layer
/// re-blocks them.
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read whatever samples have accumulated since the last call.
    ///
    /// An empty vector means no new audio yet, not end of stream.
    fn read_samples(&mut self) -> Result<Vec<f32>>;
}

/// Mock audio source for testing
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    samples: Vec<f32>,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a new mock audio source with default settings
    pub fn new() -> Self {
        Self {
            is_started: false,
            samples: vec![0.0; 160],
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to return specific samples on every read
    pub fn with_samples(mut self, samples: Vec<f32>) -> Self {
        self.samples = samples;
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the audio source is started
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            Err(WakestreamError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = true;
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        if self.should_fail_read {
            Err(WakestreamError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else if self.is_started {
            Ok(self.samples.clone())
        } else {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_returns_nothing_before_start() {
        let mut source = MockAudioSource::new();
        assert!(source.read_samples().unwrap().is_empty());
    }

    #[test]
    fn test_mock_returns_samples_after_start() {
        let mut source = MockAudioSource::new().with_samples(vec![0.5; 320]);
        source.start().unwrap();

        let samples = source.read_samples().unwrap();
        assert_eq!(samples.len(), 320);
        assert!(samples.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_mock_start_failure() {
        let mut source = MockAudioSource::new()
            .with_start_failure()
            .with_error_message("device busy");

        let err = source.start().unwrap_err();
        assert!(err.to_string().contains("device busy"));
        assert!(!source.is_started());
    }

    #[test]
    fn test_mock_read_failure() {
        let mut source = MockAudioSource::new().with_read_failure();
        source.start().unwrap();
        assert!(source.read_samples().is_err());
    }

    #[test]
    fn test_mock_stop() {
        let mut source = MockAudioSource::new();
        source.start().unwrap();
        source.stop().unwrap();
        assert!(!source.is_started());
        assert!(source.read_samples().unwrap().is_empty());
    }
}
