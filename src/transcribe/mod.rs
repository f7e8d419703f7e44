//! Transcription: the speech-engine abstraction and the single-consumer
//! worker that builds the ordered transcript.

pub mod engine;
pub mod whisper_http;
pub mod worker;

pub use engine::{MockSpeechEngine, SpeechEngine, SpeechOutput, SpeechParams, SpeechRequest};
pub use whisper_http::WhisperServerClient;
pub use worker::{TranscriptionResult, TranscriptionWorker};
