//! Transcription worker: a single background FIFO consumer.
//!
//! Segments are processed strictly one at a time, in arrival order, because
//! every call passes the trailing transcript text as engine context; parallel
//! or reordered calls would corrupt both the context and the transcript. One
//! bad segment is skipped, never allowed to stall the session.

use crate::config::SessionOptions;
use crate::events::{EventSender, PipelineEvent};
use crate::resilience::{ResilientClient, ServiceError, ServiceId};
use crate::segment::AudioSegment;
use crate::session::SessionState;
use crate::transcribe::engine::{SpeechEngine, SpeechParams, SpeechRequest};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outcome of transcribing one segment, applied to the transcript in
/// strict ordinal order.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    pub segment_id: Uuid,
    pub ordinal: u64,
    /// The exact text appended to the transcript for this segment, including
    /// the separating space when one was inserted. Concatenating result
    /// texts in ordinal order reproduces the transcript.
    pub text: String,
    pub detected_language: Option<String>,
    pub confidence: f32,
    pub processing_time_ms: u64,
    pub segment_start: DateTime<Utc>,
    pub segment_end: DateTime<Utc>,
}

pub struct TranscriptionWorker<E: SpeechEngine> {
    engine: Arc<E>,
    client: ResilientClient,
    params: SpeechParams,
    context_chars: usize,
    transcript: String,
    session: Arc<SessionState>,
    events: EventSender,
}

impl<E: SpeechEngine + 'static> TranscriptionWorker<E> {
    pub fn new(
        engine: Arc<E>,
        params: SpeechParams,
        options: &SessionOptions,
        session: Arc<SessionState>,
        events: EventSender,
    ) -> Self {
        Self {
            engine,
            client: ResilientClient::new(ServiceId::SpeechRecognition, options, events.clone()),
            params,
            context_chars: options.context_chars,
            transcript: String::new(),
            session,
            events,
        }
    }

    /// The transcript built so far.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Trailing `context_chars` characters of the transcript, on a char
    /// boundary, or `None` while the transcript is empty.
    fn context_tail(&self) -> Option<String> {
        if self.transcript.is_empty() {
            return None;
        }
        let mut start = self.transcript.len().saturating_sub(self.context_chars);
        while !self.transcript.is_char_boundary(start) {
            start += 1;
        }
        Some(self.transcript[start..].to_string())
    }

    /// Transcribes one segment through the resilience layer and applies the
    /// result to the transcript.
    async fn process(&mut self, segment: AudioSegment) -> Result<TranscriptionResult, ServiceError> {
        let started = tokio::time::Instant::now();
        let context = self.context_tail();
        let params = self.params.clone();
        let engine = Arc::clone(&self.engine);
        let audio = Arc::new(segment.audio_bytes);

        let output = self
            .client
            .call(|attempt| {
                let engine = Arc::clone(&engine);
                let audio = Arc::clone(&audio);
                let request = SpeechRequest::for_attempt(&params, attempt, context.clone());
                async move { engine.transcribe(&audio, &request).await }
            })
            .await?;

        let recognized = output.text.trim();
        let appended = if recognized.is_empty() {
            String::new()
        } else if self.transcript.is_empty() {
            recognized.to_string()
        } else {
            format!(" {}", recognized)
        };
        self.transcript.push_str(&appended);

        Ok(TranscriptionResult {
            segment_id: segment.id,
            ordinal: segment.ordinal,
            text: appended,
            detected_language: output.detected_language,
            confidence: output.confidence,
            processing_time_ms: started.elapsed().as_millis() as u64,
            segment_start: segment.start_time,
            segment_end: segment.end_time,
        })
    }

    /// Drains the segment queue until it closes, forwarding results in
    /// ordinal order. Returns the final transcript.
    pub async fn run(
        mut self,
        mut segment_rx: mpsc::UnboundedReceiver<AudioSegment>,
        result_tx: mpsc::UnboundedSender<TranscriptionResult>,
    ) -> String {
        while let Some(segment) = segment_rx.recv().await {
            let segment_id = segment.id;
            let ordinal = segment.ordinal;
            match self.process(segment).await {
                Ok(result) => {
                    self.session.update_stats(|s| s.segments_transcribed += 1);
                    self.events.emit(PipelineEvent::Transcribed(result.clone()));
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(ordinal, "segment skipped: {}", error);
                    self.session.update_stats(|s| s.segments_failed += 1);
                    self.events.emit(PipelineEvent::TranscriptionFailed {
                        segment_id,
                        error: error.to_string(),
                    });
                }
            }
        }
        tracing::debug!("transcription worker drained");
        self.transcript
    }
}
