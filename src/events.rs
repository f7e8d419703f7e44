//! Events surfaced by the live pipeline.
//!
//! Everything an embedding application needs to render a session in progress
//! arrives on one unbounded event channel. Emission never blocks a pipeline
//! task, and a dropped receiver never stops the pipeline.

use crate::resilience::{CircuitStateKind, ServiceId};
use crate::session::{Session, SentenceSegment};
use crate::transcribe::TranscriptionResult;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Notification emitted by the running pipeline.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A self-contained audio segment was cut and queued for transcription.
    ///
    /// Carries metadata only; the audio bytes travel on the worker queue and
    /// are dropped after transcription.
    SegmentReady {
        segment_id: Uuid,
        ordinal: u64,
        duration_ms: u64,
    },
    /// A segment was recognized and appended to the transcript.
    Transcribed(TranscriptionResult),
    /// A segment could not be recognized and was skipped.
    TranscriptionFailed { segment_id: Uuid, error: String },
    /// The segmenter confirmed a complete sentence.
    SentenceReady(SentenceSegment),
    /// A sentence changed status or gained a translation.
    SentenceUpdate(SentenceSegment),
    /// A per-service circuit breaker changed state.
    CircuitBreakerStateChanged {
        service: ServiceId,
        state: CircuitStateKind,
    },
    /// The session entered or left transcription-only mode.
    FallbackModeChanged { active: bool },
    /// Audio capture failed; the session cannot continue recording.
    CaptureFailed { message: String },
    /// The session was stopped, drained, and finalized.
    SessionFinalized(Box<Session>),
}

impl PipelineEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::SegmentReady { .. } => "segment-ready",
            PipelineEvent::Transcribed(_) => "transcribed",
            PipelineEvent::TranscriptionFailed { .. } => "transcription-failed",
            PipelineEvent::SentenceReady(_) => "sentence-ready",
            PipelineEvent::SentenceUpdate(_) => "sentence-update",
            PipelineEvent::CircuitBreakerStateChanged { .. } => "circuit-breaker-state-changed",
            PipelineEvent::FallbackModeChanged { .. } => "fallback-mode-changed",
            PipelineEvent::CaptureFailed { .. } => "capture-failed",
            PipelineEvent::SessionFinalized(_) => "session-finalized",
        }
    }
}

/// Cloneable emitter handed to every pipeline task.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl EventSender {
    /// Creates an emitter and its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emits an event. A closed receiver is not an error: the pipeline keeps
    /// running even if nobody is listening.
    pub fn emit(&self, event: PipelineEvent) {
        tracing::trace!(event = event.name(), "pipeline event");
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let event = PipelineEvent::FallbackModeChanged { active: true };
        assert_eq!(event.name(), "fallback-mode-changed");

        let event = PipelineEvent::CaptureFailed {
            message: "device lost".to_string(),
        };
        assert_eq!(event.name(), "capture-failed");
    }

    #[tokio::test]
    async fn test_emit_and_receive() {
        let (events, mut rx) = EventSender::channel();
        events.emit(PipelineEvent::FallbackModeChanged { active: true });

        let received = rx.recv().await.expect("event");
        assert!(matches!(
            received,
            PipelineEvent::FallbackModeChanged { active: true }
        ));
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_is_silent() {
        let (events, rx) = EventSender::channel();
        drop(rx);
        // Must not panic or error.
        events.emit(PipelineEvent::FallbackModeChanged { active: false });
    }
}
