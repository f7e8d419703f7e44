//! Audio input: source abstraction, level measurement, WAV encoding, and the
//! optional CPAL microphone backend.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod source;
pub mod wav;

#[cfg(feature = "cpal-audio")]
pub use capture::CpalAudioSource;
pub use source::{AudioSource, MockAudioSource, peak_level_percent};
pub use wav::encode_wav;
