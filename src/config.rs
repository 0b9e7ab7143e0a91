use crate::defaults;
use crate::error::{Result, WakestreamError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub vad: VadSettings,
    pub wakeword: WakewordSettings,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub ring_capacity: usize,
}

/// Voice-activity detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadSettings {
    pub threshold: f32,
    pub hangover_frames: u32,
}

/// Wake-word detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WakewordSettings {
    /// Directory holding the model graphs.
    pub model_dir: Option<PathBuf>,
    pub threshold: f32,
    /// Treat the model as a single fused graph instead of three stages.
    pub single_stage: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            ring_capacity: defaults::RING_CAPACITY,
        }
    }
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            threshold: defaults::VAD_THRESHOLD,
            hangover_frames: defaults::VAD_HANGOVER_FRAMES,
        }
    }
}

impl Default for WakewordSettings {
    fn default() -> Self {
        Self {
            model_dir: None,
            threshold: defaults::WAKEWORD_THRESHOLD,
            single_stage: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WakestreamError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                WakestreamError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if it is missing
    ///
    /// Invalid TOML is still an error; only a missing file falls back.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(WakestreamError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - WAKESTREAM_AUDIO_DEVICE → audio.device
    /// - WAKESTREAM_MODEL_DIR → wakeword.model_dir
    /// - WAKESTREAM_WAKEWORD_THRESHOLD → wakeword.threshold
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("WAKESTREAM_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(model_dir) = std::env::var("WAKESTREAM_MODEL_DIR")
            && !model_dir.is_empty()
        {
            self.wakeword.model_dir = Some(PathBuf::from(model_dir));
        }

        if let Ok(threshold) = std::env::var("WAKESTREAM_WAKEWORD_THRESHOLD")
            && let Ok(value) = threshold.parse::<f32>()
        {
            self.wakeword.threshold = value;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/wakestream/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wakestream").join("config.toml"))
    }
}
