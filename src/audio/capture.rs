//! Real audio capture using CPAL (Cross-Platform Audio Library).

use crate::audio::recorder::AudioSource;
use crate::defaults;
use crate::error::{Result, WakestreamError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// SAFETY: the stream is only touched through the Mutex in
/// `CpalAudioSource`; its methods are called synchronously from whichever
/// thread currently owns the guard.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// List all available audio input device names.
pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| WakestreamError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;

    Ok(devices.filter_map(|device| device.name().ok()).collect())
}

/// Real audio capture implementation using CPAL.
///
/// Captures f32 mono at the fixed 16kHz stream rate. Devices that cannot
/// deliver that config (directly or via the sound server's transparent
/// conversion) are rejected rather than resampled in software.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    buffer: Arc<Mutex<Vec<f32>>>,
}

impl CpalAudioSource {
    /// Create a new CPAL audio source.
    ///
    /// With `device_name` of `None`, the host's default input device is
    /// used.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name {
            let mut found = None;
            let devices = host
                .input_devices()
                .map_err(|e| WakestreamError::AudioCapture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;
            for candidate in devices {
                if let Ok(candidate_name) = candidate.name()
                    && candidate_name == name
                {
                    found = Some(candidate);
                    break;
                }
            }
            found.ok_or_else(|| WakestreamError::AudioDeviceNotFound {
                device: name.to_string(),
            })?
        } else {
            host.default_input_device()
                .ok_or_else(|| WakestreamError::AudioDeviceNotFound {
                    device: "default".to_string(),
                })?
        };

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(defaults::SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("Audio stream error: {}", err);
        };

        // f32/16kHz/mono — PipeWire/PulseAudio convert transparently
        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // i16/16kHz/mono — for devices that only expose integer formats
        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(data.iter().map(|&s| s as f32 / i16::MAX as f32));
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| WakestreamError::AudioFormatMismatch {
                expected: format!("{} Hz mono", defaults::SAMPLE_RATE),
                actual: format!("unsupported by device: {}", e),
            })
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let mut guard = self
            .stream
            .lock()
            .map_err(|e| WakestreamError::AudioCapture {
                message: format!("Failed to lock stream: {}", e),
            })?;
        if guard.is_some() {
            return Ok(()); // Already started
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| WakestreamError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;
        *guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut guard = self
            .stream
            .lock()
            .map_err(|e| WakestreamError::AudioCapture {
                message: format!("Failed to lock stream: {}", e),
            })?;
        *guard = None; // Dropping the stream stops capture
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|e| WakestreamError::AudioCapture {
                message: format!("Failed to lock buffer: {}", e),
            })?;
        Ok(std::mem::take(&mut *buffer))
    }
}
