//! WAV file audio source for offline scanning.

use crate::audio::recorder::AudioSource;
use crate::defaults::SAMPLE_RATE;
use crate::error::{Result, WakestreamError};
use std::path::Path;

/// Batch size delivered per `read_samples` call (100ms at 16kHz), chosen to
/// resemble a real capture callback rather than one giant buffer.
const READ_CHUNK: usize = 1600;

/// Loads a WAV file as mono f32 samples at the fixed stream rate.
///
/// Stereo input is averaged down to mono. A sample rate other than 16kHz is
/// rejected rather than resampled — rate conversion belongs upstream.
pub fn load_wav_mono(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.sample_rate != SAMPLE_RATE {
        return Err(WakestreamError::AudioFormatMismatch {
            expected: format!("{} Hz", SAMPLE_RATE),
            actual: format!("{} Hz", spec.sample_rate),
        });
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    let samples = match spec.channels {
        1 => interleaved,
        2 => interleaved
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect(),
        n => {
            return Err(WakestreamError::AudioFormatMismatch {
                expected: "mono or stereo".to_string(),
                actual: format!("{} channels", n),
            });
        }
    };

    Ok(samples)
}

/// Audio source that replays a WAV file in capture-sized batches.
pub struct WavAudioSource {
    samples: Vec<f32>,
    position: usize,
    started: bool,
}

impl WavAudioSource {
    /// Opens a WAV file for replay.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            samples: load_wav_mono(path)?,
            position: 0,
            started: false,
        })
    }

    /// Consume the source and return all samples as a single buffer.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// True once the whole file has been read out.
    pub fn exhausted(&self) -> bool {
        self.position >= self.samples.len()
    }
}

impl AudioSource for WavAudioSource {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        if !self.started || self.exhausted() {
            return Ok(Vec::new());
        }
        let end = (self.position + READ_CHUNK).min(self.samples.len());
        let batch = self.samples[self.position..end].to_vec();
        self.position = end;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_mono_16k() {
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), 16000, 1, &[0, i16::MAX, i16::MIN + 1]);

        let samples = load_wav_mono(file.path()).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 1.0).abs() < 1e-6);
        assert!((samples[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stereo_averaged_to_mono() {
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), 16000, 2, &[1000, 3000, -2000, 2000]);

        let samples = load_wav_mono(file.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 2000.0 / i16::MAX as f32).abs() < 1e-6);
        assert!(samples[1].abs() < 1e-6);
    }

    #[test]
    fn test_wrong_sample_rate_rejected() {
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), 44100, 1, &[0; 10]);

        let err = load_wav_mono(file.path()).unwrap_err();
        assert!(matches!(err, WakestreamError::AudioFormatMismatch { .. }));
    }

    #[test]
    fn test_source_replays_in_batches() {
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), 16000, 1, &vec![100i16; 4000]);

        let mut source = WavAudioSource::open(file.path()).unwrap();
        assert!(source.read_samples().unwrap().is_empty(), "not started yet");

        source.start().unwrap();
        let mut total = 0;
        loop {
            let batch = source.read_samples().unwrap();
            if batch.is_empty() {
                break;
            }
            assert!(batch.len() <= READ_CHUNK);
            total += batch.len();
        }
        assert_eq!(total, 4000);
        assert!(source.exhausted());
    }
}
