//! Audio source abstraction.
//!
//! The segment producer polls an [`AudioSource`] for PCM frames and derives
//! the current audio level from the samples themselves, so cut decisions are
//! testable without a real device.

use crate::defaults;
use crate::error::{Result, TransliveError};
use std::collections::VecDeque;

/// Trait for audio source devices.
///
/// This trait allows swapping implementations (real microphone vs mock).
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read whatever audio samples have accumulated since the last read.
    ///
    /// Returns an empty vector when no new samples are available. An error is
    /// terminal: the producer surfaces it as a capture failure and stops.
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    /// Sample rate of the produced audio.
    fn sample_rate(&self) -> u32 {
        defaults::SAMPLE_RATE
    }
}

/// Peak audio level of a frame as a percentage of full scale.
pub fn peak_level_percent(samples: &[i16]) -> f32 {
    let peak = samples
        .iter()
        .map(|s| (*s as i32).unsigned_abs())
        .max()
        .unwrap_or(0);
    (peak as f32 / i16::MAX as f32) * 100.0
}

/// Mock audio source for testing.
///
/// Plays back a script of frames, then returns silence (empty reads).
pub struct MockAudioSource {
    frames: VecDeque<Vec<i16>>,
    is_started: bool,
    fail_start: bool,
    fail_read_after: Option<usize>,
    reads: usize,
    error_message: String,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            is_started: false,
            fail_start: false,
            fail_read_after: None,
            reads: 0,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Queues frames to be returned by successive reads.
    pub fn with_frames(mut self, frames: Vec<Vec<i16>>) -> Self {
        self.frames = frames.into();
        self
    }

    /// Queues `count` frames of constant-amplitude audio.
    pub fn with_tone(mut self, amplitude: i16, samples_per_frame: usize, count: usize) -> Self {
        for _ in 0..count {
            self.frames.push_back(vec![amplitude; samples_per_frame]);
        }
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Configure the mock to fail on the read after `reads` successful ones.
    pub fn with_read_failure_after(mut self, reads: usize) -> Self {
        self.fail_read_after = Some(reads);
        self
    }

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
        if self.fail_start {
            return Err(TransliveError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if let Some(limit) = self.fail_read_after {
            if self.reads >= limit {
                return Err(TransliveError::AudioCapture {
                    message: self.error_message.clone(),
                });
            }
        }
        self.reads += 1;
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_level_percent() {
        assert_eq!(peak_level_percent(&[]), 0.0);
        assert_eq!(peak_level_percent(&[0, 0, 0]), 0.0);

        let half = peak_level_percent(&[i16::MAX / 2]);
        assert!((half - 50.0).abs() < 0.1, "got {}", half);

        let full = peak_level_percent(&[i16::MAX, 0]);
        assert!((full - 100.0).abs() < 0.01);

        // Negative peaks count too, including i16::MIN.
        let negative = peak_level_percent(&[i16::MIN]);
        assert!(negative > 100.0 - 0.1);
    }

    #[test]
    fn test_mock_source_plays_frames_then_silence() {
        let mut source = MockAudioSource::new().with_frames(vec![vec![1, 2], vec![3]]);
        source.start().expect("start");

        assert_eq!(source.read_samples().expect("read"), vec![1, 2]);
        assert_eq!(source.read_samples().expect("read"), vec![3]);
        assert!(source.read_samples().expect("read").is_empty());
    }

    #[test]
    fn test_mock_source_start_failure() {
        let mut source = MockAudioSource::new().with_start_failure();
        assert!(source.start().is_err());
    }

    #[test]
    fn test_mock_source_read_failure_after() {
        let mut source = MockAudioSource::new()
            .with_tone(1000, 160, 5)
            .with_read_failure_after(2);

        assert!(source.read_samples().is_ok());
        assert!(source.read_samples().is_ok());
        assert!(source.read_samples().is_err());
    }

    #[test]
    fn test_mock_source_tone_builder() {
        let mut source = MockAudioSource::new().with_tone(5000, 160, 2);
        let frame = source.read_samples().expect("read");
        assert_eq!(frame.len(), 160);
        assert_eq!(frame[0], 5000);
    }
}
