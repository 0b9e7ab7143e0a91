//! Audio sources feeding the detector.

pub mod recorder;
pub mod wav;

#[cfg(feature = "cpal-audio")]
pub mod capture;

pub use recorder::{AudioSource, MockAudioSource};
pub use wav::WavAudioSource;

#[cfg(feature = "cpal-audio")]
pub use capture::CpalAudioSource;
