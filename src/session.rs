//! Session model: the ordered sentence list, statistics, and finalization.
//!
//! A [`SessionState`] is shared by the pipeline tasks while recording runs.
//! The segmenter side is the only appender of sentences and the translation
//! side the only mutator of translation fields, so the mutex never sees
//! contention beyond brief clone-out reads.

use crate::config::SessionOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

/// Lifecycle of a sentence within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceStatus {
    /// Recognized text, not yet handed to translation.
    Transcribed,
    /// Translation call in flight.
    Translating,
    /// Translation accepted.
    Translated,
    /// Translation gave up; `translated_text` holds the annotated original.
    Error,
}

impl SentenceStatus {
    /// Terminal states are never mutated again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SentenceStatus::Translated | SentenceStatus::Error)
    }
}

/// A complete recognized sentence, the unit of UI update and export.
///
/// `text` is the exact transcript slice that produced the sentence, so
/// concatenating all sentence texts reproduces the transcript byte for byte.
/// Use [`SentenceSegment::display_text`] for trimmed presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceSegment {
    pub id: u64,
    pub text: String,
    pub translated_text: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub source_language: String,
    pub target_language: String,
    pub confidence: f32,
    pub status: SentenceStatus,
}

impl SentenceSegment {
    /// Sentence text with surrounding whitespace removed.
    pub fn display_text(&self) -> &str {
        self.text.trim()
    }
}

/// Counters accumulated over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub segments_produced: u64,
    pub segments_transcribed: u64,
    pub segments_failed: u64,
    pub sentences_total: u64,
    pub sentences_translated: u64,
    pub sentences_failed: u64,
    /// Times the session dropped to transcription-only mode.
    pub fallback_entries: u64,
}

/// A finalized session: immutable, serializable, always exportable even with
/// zero successful translations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub source_language: String,
    pub target_language: String,
    pub sentences: Vec<SentenceSegment>,
    pub audio_ref: Option<PathBuf>,
    pub stats: SessionStats,
}

impl Session {
    /// Reconstructs the running transcript from the sentence slices.
    pub fn transcript(&self) -> String {
        self.sentences.iter().map(|s| s.text.as_str()).collect()
    }

    /// Serializes the session to pretty-printed JSON for export.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

struct SessionInner {
    id: Uuid,
    start_time: DateTime<Utc>,
    source_language: String,
    target_language: String,
    sentences: Vec<SentenceSegment>,
    audio_ref: Option<PathBuf>,
    stats: SessionStats,
}

/// Mutable session state shared by the pipeline tasks while running.
pub struct SessionState {
    inner: Mutex<SessionInner>,
}

impl SessionState {
    /// Creates state for a session starting now.
    pub fn new(options: &SessionOptions) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                id: Uuid::new_v4(),
                start_time: Utc::now(),
                source_language: options.source_language.clone(),
                target_language: options.target_language.clone(),
                sentences: Vec::new(),
                audio_ref: None,
                stats: SessionStats::default(),
            }),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.lock().id
    }

    /// Records where the session audio is being persisted.
    pub fn set_audio_ref(&self, path: PathBuf) {
        self.lock().audio_ref = Some(path);
    }

    /// Appends a sentence, preserving emission order.
    pub fn push_sentence(&self, sentence: SentenceSegment) {
        let mut inner = self.lock();
        inner.stats.sentences_total += 1;
        inner.sentences.push(sentence);
    }

    /// Applies a mutation to the sentence with the given id and returns the
    /// updated copy, or `None` if the id is unknown.
    pub fn update_sentence<F>(&self, id: u64, mutate: F) -> Option<SentenceSegment>
    where
        F: FnOnce(&mut SentenceSegment),
    {
        let mut inner = self.lock();
        let sentence = inner.sentences.iter_mut().find(|s| s.id == id)?;
        mutate(sentence);
        Some(sentence.clone())
    }

    /// Returns a copy of the sentence with the given id.
    pub fn sentence(&self, id: u64) -> Option<SentenceSegment> {
        self.lock().sentences.iter().find(|s| s.id == id).cloned()
    }

    /// Returns copies of all sentences in emission order.
    pub fn sentences(&self) -> Vec<SentenceSegment> {
        self.lock().sentences.clone()
    }

    /// Applies a mutation to the statistics counters.
    pub fn update_stats<F>(&self, mutate: F)
    where
        F: FnOnce(&mut SessionStats),
    {
        mutate(&mut self.lock().stats);
    }

    /// Returns a copy of the current statistics.
    pub fn stats(&self) -> SessionStats {
        self.lock().stats.clone()
    }

    /// Freezes the state into an immutable, exportable [`Session`].
    pub fn finalize(&self) -> Session {
        let inner = self.lock();
        Session {
            id: inner.id,
            start_time: inner.start_time,
            end_time: Utc::now(),
            source_language: inner.source_language.clone(),
            target_language: inner.target_language.clone(),
            sentences: inner.sentences.clone(),
            audio_ref: inner.audio_ref.clone(),
            stats: inner.stats.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            // A poisoned session mutex only means a task panicked mid-update;
            // the sentence list itself is still structurally valid.
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sentence(id: u64, text: &str) -> SentenceSegment {
        SentenceSegment {
            id,
            text: text.to_string(),
            translated_text: None,
            start_time: Utc::now(),
            end_time: Utc::now(),
            source_language: "en".to_string(),
            target_language: "de".to_string(),
            confidence: 0.9,
            status: SentenceStatus::Transcribed,
        }
    }

    #[test]
    fn test_push_and_update_sentence() {
        let state = SessionState::new(&SessionOptions::default());
        state.push_sentence(make_sentence(0, "Hello there."));
        state.push_sentence(make_sentence(1, " How are you?"));

        let updated = state.update_sentence(1, |s| {
            s.status = SentenceStatus::Translated;
            s.translated_text = Some("Wie geht es dir?".to_string());
        });
        assert_eq!(updated.and_then(|s| s.translated_text), Some("Wie geht es dir?".to_string()));

        assert!(state.update_sentence(99, |_| {}).is_none());
    }

    #[test]
    fn test_finalize_preserves_order_and_transcript() {
        let state = SessionState::new(&SessionOptions::default());
        state.push_sentence(make_sentence(0, "Hello there."));
        state.push_sentence(make_sentence(1, " How are you?"));

        let session = state.finalize();
        assert_eq!(session.sentences.len(), 2);
        assert_eq!(session.transcript(), "Hello there. How are you?");
        assert!(session.end_time >= session.start_time);
    }

    #[test]
    fn test_stats_counters() {
        let state = SessionState::new(&SessionOptions::default());
        state.update_stats(|s| s.segments_produced += 1);
        state.update_stats(|s| s.segments_transcribed += 1);
        state.push_sentence(make_sentence(0, "One."));

        let stats = state.stats();
        assert_eq!(stats.segments_produced, 1);
        assert_eq!(stats.sentences_total, 1);
    }

    #[test]
    fn test_session_export_json() {
        let state = SessionState::new(&SessionOptions::default());
        state.push_sentence(make_sentence(0, "Hello."));
        let session = state.finalize();

        let json = session.to_json().expect("export");
        assert!(json.contains("\"transcribed\""));
        assert!(json.contains("Hello."));
    }

    #[test]
    fn test_status_terminal() {
        assert!(SentenceStatus::Translated.is_terminal());
        assert!(SentenceStatus::Error.is_terminal());
        assert!(!SentenceStatus::Transcribed.is_terminal());
        assert!(!SentenceStatus::Translating.is_terminal());
    }
}
