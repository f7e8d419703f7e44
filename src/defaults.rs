//! Default configuration constants for translive.
//!
//! Shared constants used across configuration types to ensure consistency
//! and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default segment duration in milliseconds.
///
/// Each timer firing closes the current audio segment, so this bounds the
/// baseline latency between speaking and seeing a transcription.
pub const CHUNK_DURATION_MS: u64 = 5000;

/// Lower clamp for the segment duration.
pub const MIN_CHUNK_DURATION_MS: u64 = 3000;

/// Upper clamp for the segment duration.
pub const MAX_CHUNK_DURATION_MS: u64 = 10000;

/// Maximum extension past the segment boundary while waiting for a quiet
/// moment to cut, in milliseconds.
///
/// Bounds the worst-case segment length to
/// `CHUNK_DURATION_MS + MAX_EXTENSION_MS` while avoiding mid-word cuts.
pub const MAX_EXTENSION_MS: u64 = 2000;

/// Audio level (percent of full scale) below which a cut point is
/// considered safe.
pub const QUIET_THRESHOLD: f32 = 15.0;

/// Number of trailing transcript characters passed to the speech engine
/// as context for the next segment.
pub const CONTEXT_CHARS: usize = 1000;

/// Number of recent (original, translated) pairs kept in the context window.
pub const CONTEXT_WINDOW_PAIRS: usize = 10;

/// Number of context pairs included inline in a translation prompt.
pub const PROMPT_CONTEXT_PAIRS: usize = 3;

/// Maximum translation attempts per sentence before falling back to the
/// original text.
pub const MAX_TRANSLATION_ATTEMPTS: u32 = 3;

/// Maximum attempts per external-service call, including the first.
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff between retries, in milliseconds.
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Upper bound on a single backoff delay, in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 5000;

/// Consecutive failures before a circuit breaker opens.
pub const CIRCUIT_BREAKER_THRESHOLD: u32 = 5;

/// Cool-down before an open circuit breaker permits a trial call, in
/// milliseconds.
pub const CIRCUIT_BREAKER_COOLDOWN_MS: u64 = 30_000;

/// Polling interval for the audio capture loop, in milliseconds.
pub const CAPTURE_POLL_INTERVAL_MS: u64 = 50;

/// Default source language code ("auto" lets the engine detect).
pub const SOURCE_LANGUAGE: &str = "auto";

/// Default target language code.
pub const TARGET_LANGUAGE: &str = "en";

/// Default speech-recognition endpoint (OpenAI-compatible local server).
pub const SPEECH_BASE_URL: &str = "http://localhost:8080/v1";

/// Default speech-recognition model.
pub const SPEECH_MODEL: &str = "whisper-base";

/// Reduced-quality speech model used when the service reports resource
/// pressure.
pub const SPEECH_MODEL_REDUCED: &str = "whisper-tiny";

/// Default language-model inference endpoint (Ollama).
pub const LLM_BASE_URL: &str = "http://localhost:11434";

/// Default translation model.
pub const LLM_MODEL: &str = "qwen2.5:1.5b";

/// Faster alternate model tried on the last translation attempt.
pub const LLM_MODEL_ALTERNATE: &str = "llama3.2";

/// Request timeout for external-service calls, in milliseconds.
pub const REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Prefix applied to `translated_text` when translation gave up and fell
/// back to the original sentence.
pub const UNTRANSLATED_PREFIX: &str = "[untranslated] ";
