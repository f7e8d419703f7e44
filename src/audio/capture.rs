//! Microphone capture using CPAL (Cross-Platform Audio Library).
//!
//! Captures 16-bit PCM at 16kHz mono, the format the speech engine expects.
//! Tries an i16 stream first, then falls back to f32 with sample conversion
//! for devices that only expose float formats.

use crate::audio::source::AudioSource;
use crate::defaults;
use crate::error::{Result, TransliveError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only accessed behind the Mutex in CpalAudioSource,
/// one thread at a time.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Real audio capture implementation using CPAL.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    buffer: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
}

impl CpalAudioSource {
    /// Creates a capture source for the named device, or the system default
    /// input device when `device_name` is `None`.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name {
            let devices = host.input_devices().map_err(|e| TransliveError::AudioCapture {
                message: format!("Failed to enumerate devices: {}", e),
            })?;
            let mut found = None;
            for dev in devices {
                if dev.name().map(|n| n == name).unwrap_or(false) {
                    found = Some(dev);
                    break;
                }
            }
            found.ok_or_else(|| TransliveError::AudioDeviceNotFound {
                device: name.to_string(),
            })?
        } else {
            host.default_input_device()
                .ok_or_else(|| TransliveError::AudioDeviceNotFound {
                    device: "default".to_string(),
                })?
        };

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    /// Lists available input device names.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().map_err(|e| TransliveError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            tracing::error!("Audio stream error: {}", err);
        };

        // Preferred: i16/16kHz/mono, zero-copy path.
        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Fallback: f32 with conversion, for devices that only expose floats.
        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(
                            data.iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                        );
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| TransliveError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let stream = self.build_stream()?;
        stream.play().map_err(|e| TransliveError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        if let Ok(mut slot) = self.stream.lock() {
            *slot = Some(SendableStream(stream));
        }
        tracing::info!(sample_rate = self.sample_rate, "audio capture started");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Ok(mut slot) = self.stream.lock() {
            *slot = None;
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buffer = self.buffer.lock().map_err(|_| TransliveError::AudioCapture {
            message: "audio buffer poisoned".to_string(),
        })?;
        Ok(std::mem::take(&mut *buffer))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
