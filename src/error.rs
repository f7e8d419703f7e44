//! Error types for translive.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransliveError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("WAV encoding failed: {message}")]
    WavEncode { message: String },

    // Transcription errors
    #[error("Transcription failed for segment {segment_id}: {message}")]
    Transcription { segment_id: String, message: String },

    // Translation errors
    #[error("Translation failed for sentence {sentence_id}: {message}")]
    Translation { sentence_id: u64, message: String },

    // Session errors
    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Session export failed: {0}")]
    SessionExport(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TransliveError>;
