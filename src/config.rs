use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub session: SessionOptions,
    pub speech: SpeechServiceConfig,
    pub llm: LlmServiceConfig,
}

/// Start-time options for a live session.
///
/// These are fixed when the session starts; changing them mid-session is
/// not supported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionOptions {
    /// Source language code, or "auto" for engine-side detection.
    pub source_language: String,
    /// Target language code for translation.
    pub target_language: String,
    /// Segment duration in milliseconds (clamped to 3000..=10000).
    pub chunk_duration_ms: u64,
    /// Maximum cut deferral past the segment boundary, in milliseconds.
    pub max_extension_ms: u64,
    /// Audio level percentage below which a cut is considered safe.
    pub quiet_threshold: f32,
    /// Trailing transcript characters passed as speech-engine context.
    pub context_chars: usize,
    /// Maximum attempts per external-service call, including the first.
    pub max_retries: u32,
    /// Consecutive failures before a circuit breaker opens.
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker cool-down in milliseconds.
    pub circuit_breaker_cooldown_ms: u64,
    /// Translation attempts per sentence before falling back to the original.
    pub max_translation_attempts: u32,
    /// (original, translated) pairs retained in the translation context window.
    pub context_pairs: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            source_language: defaults::SOURCE_LANGUAGE.to_string(),
            target_language: defaults::TARGET_LANGUAGE.to_string(),
            chunk_duration_ms: defaults::CHUNK_DURATION_MS,
            max_extension_ms: defaults::MAX_EXTENSION_MS,
            quiet_threshold: defaults::QUIET_THRESHOLD,
            context_chars: defaults::CONTEXT_CHARS,
            max_retries: defaults::MAX_RETRIES,
            circuit_breaker_threshold: defaults::CIRCUIT_BREAKER_THRESHOLD,
            circuit_breaker_cooldown_ms: defaults::CIRCUIT_BREAKER_COOLDOWN_MS,
            max_translation_attempts: defaults::MAX_TRANSLATION_ATTEMPTS,
            context_pairs: defaults::CONTEXT_WINDOW_PAIRS,
        }
    }
}

impl SessionOptions {
    /// Returns a copy with out-of-range values clamped to supported bounds.
    pub fn clamped(mut self) -> Self {
        self.chunk_duration_ms = self
            .chunk_duration_ms
            .clamp(defaults::MIN_CHUNK_DURATION_MS, defaults::MAX_CHUNK_DURATION_MS);
        self.quiet_threshold = self.quiet_threshold.clamp(0.0, 100.0);
        self.max_retries = self.max_retries.max(1);
        self.max_translation_attempts = self.max_translation_attempts.max(1);
        self.context_pairs = self.context_pairs.max(1);
        self
    }
}

/// Speech-recognition service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechServiceConfig {
    /// Base URL of the OpenAI-compatible transcription endpoint.
    pub base_url: String,
    /// Model requested for normal-quality transcription.
    pub model: String,
    /// Smaller model used when the service reports resource pressure.
    pub model_reduced: String,
    /// Sampling temperature passed to the engine.
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SpeechServiceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::SPEECH_BASE_URL.to_string(),
            model: defaults::SPEECH_MODEL.to_string(),
            model_reduced: defaults::SPEECH_MODEL_REDUCED.to_string(),
            temperature: 0.0,
            timeout_ms: defaults::REQUEST_TIMEOUT_MS,
        }
    }
}

/// Language-model inference service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmServiceConfig {
    /// Base URL of the inference service (Ollama-compatible).
    pub base_url: String,
    /// Primary translation model.
    pub model: String,
    /// Faster alternate model for the last-resort translation attempt.
    pub model_alternate: String,
    /// Sampling temperature for generation.
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for LlmServiceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::LLM_BASE_URL.to_string(),
            model: defaults::LLM_MODEL.to_string(),
            model_alternate: defaults::LLM_MODEL_ALTERNATE.to_string(),
            temperature: 0.3,
            timeout_ms: defaults::REQUEST_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// Missing keys fall back to defaults; a missing file is an error so the
    /// caller can decide whether to create one.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Err(crate::error::TransliveError::ConfigFileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration from a file, or returns defaults if it is missing.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default config: {}", e);
                Self::default()
            }
        }
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| {
            crate::error::TransliveError::Other(format!("Failed to serialize config: {}", e))
        })?;
        fs::write(path, contents)?;
        Ok(())
    }
}
