//! # translive
//!
//! Live transcription with ongoing translation, built on local services: an
//! OpenAI-compatible speech server for recognition and an Ollama-compatible
//! server for translation.
//!
//! Audio is cut into self-contained segments at quiet points, transcribed
//! sequentially with rolling context, segmented into sentences, and
//! translated with a quality-gated retry ladder. Both external services sit
//! behind circuit breakers; when translation is down the session degrades to
//! transcription-only instead of stopping.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use translive::config::Config;
//! use translive::pipeline::LivePipeline;
//! use translive::transcribe::WhisperServerClient;
//! use translive::translate::OllamaClient;
//!
//! # #[cfg(feature = "cpal-audio")]
//! # async fn run() -> translive::error::Result<()> {
//! let config = Config::default();
//! let source = translive::audio::CpalAudioSource::new(None)?;
//! let engine = Arc::new(WhisperServerClient::new(&config.speech));
//! let model = Arc::new(OllamaClient::new(&config.llm));
//!
//! let (handle, mut events) = LivePipeline::start(&config, source, engine, model);
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.name());
//! }
//! let session = handle.stop().await?;
//! println!("{}", session.to_json()?);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod resilience;
pub mod segment;
pub mod sentence;
pub mod session;
pub mod transcribe;
pub mod translate;

pub use config::{Config, SessionOptions};
pub use error::{Result, TransliveError};
pub use events::{EventSender, PipelineEvent};
pub use pipeline::{LivePipeline, PipelineHandle};
pub use session::{SentenceSegment, SentenceStatus, Session, SessionStats};
