//! Pipeline assembly: wires capture, transcription, segmentation, and
//! translation into one running session.
//!
//! Stages communicate over unbounded channels so a slow external service
//! backs audio up in memory instead of blocking capture. Shutdown is a
//! cascade: the stop signal flushes the producer, closing the segment
//! channel; the transcription worker drains and closes the result channel;
//! the segmenter flushes its trailing sentence; the translation orchestrator
//! drains; then the session is finalized and emitted.

use crate::audio::AudioSource;
use crate::config::Config;
use crate::error::{Result, TransliveError};
use crate::events::{EventSender, PipelineEvent};
use crate::segment::{SegmentCutter, SegmentProducer, SegmentProducerConfig};
use crate::sentence::SentenceAssembler;
use crate::session::{Session, SessionState};
use crate::transcribe::{SpeechEngine, SpeechParams, TranscriptionResult, TranscriptionWorker};
use crate::translate::{LanguageModel, TranslationOrchestrator, TranslatorCommand};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// A live transcription + translation session.
pub struct LivePipeline;

impl LivePipeline {
    /// Starts all pipeline stages and returns a control handle plus the
    /// event stream.
    pub fn start<A, E, M>(
        config: &Config,
        source: A,
        engine: Arc<E>,
        model: Arc<M>,
    ) -> (PipelineHandle, mpsc::UnboundedReceiver<PipelineEvent>)
    where
        A: AudioSource + 'static,
        E: SpeechEngine + 'static,
        M: LanguageModel + 'static,
    {
        let options = config.session.clone().clamped();
        let session = Arc::new(SessionState::new(&options));
        let (events, event_rx) = EventSender::channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let (segment_tx, segment_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let (sentence_tx, sentence_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let producer = SegmentProducer::new(
            source,
            SegmentProducerConfig {
                cutter: SegmentCutter::from_options(&options),
                ..Default::default()
            },
            session.clone(),
        );
        let producer_task = tokio::spawn(producer.run(segment_tx, events.clone(), stop_rx));

        let worker = TranscriptionWorker::new(
            engine,
            SpeechParams::new(&config.speech, &options),
            &options,
            session.clone(),
            events.clone(),
        );
        let worker_task = tokio::spawn(worker.run(segment_rx, result_tx));

        let segmenter_task = tokio::spawn(run_segmenter(
            SentenceAssembler::new(&options.source_language, &options.target_language),
            result_rx,
            sentence_tx,
            session.clone(),
            events.clone(),
        ));

        let orchestrator =
            TranslationOrchestrator::new(model, &options, session.clone(), events.clone());
        let orchestrator_task = tokio::spawn(orchestrator.run(sentence_rx, command_rx));

        let supervisor = {
            let session = session.clone();
            let events = events.clone();
            tokio::spawn(async move {
                let _ = producer_task.await;
                match worker_task.await {
                    Ok(transcript) => {
                        tracing::debug!(chars = transcript.len(), "final transcript assembled");
                    }
                    Err(e) => tracing::error!("transcription worker panicked: {}", e),
                }
                let _ = segmenter_task.await;
                let _ = orchestrator_task.await;

                let finalized = session.finalize();
                tracing::info!(
                    sentences = finalized.sentences.len(),
                    "session finalized"
                );
                events.emit(PipelineEvent::SessionFinalized(Box::new(finalized.clone())));
                finalized
            })
        };

        let handle = PipelineHandle {
            stop_tx,
            command_tx,
            session,
            supervisor,
        };
        (handle, event_rx)
    }
}

/// Bridges transcription results into confirmed sentences: pushes each new
/// sentence into the session, announces it, and queues it for translation.
async fn run_segmenter(
    mut assembler: SentenceAssembler,
    mut result_rx: mpsc::UnboundedReceiver<TranscriptionResult>,
    sentence_tx: mpsc::UnboundedSender<u64>,
    session: Arc<SessionState>,
    events: EventSender,
) {
    let forward = |sentence: crate::session::SentenceSegment| {
        let id = sentence.id;
        session.push_sentence(sentence.clone());
        events.emit(PipelineEvent::SentenceReady(sentence));
        sentence_tx.send(id).is_ok()
    };

    while let Some(result) = result_rx.recv().await {
        for sentence in assembler.push(&result) {
            if !forward(sentence) {
                return;
            }
        }
    }
    if let Some(sentence) = assembler.flush() {
        forward(sentence);
    }
    tracing::debug!("sentence segmenter drained");
}

/// Control handle for a running pipeline.
pub struct PipelineHandle {
    stop_tx: watch::Sender<bool>,
    command_tx: mpsc::UnboundedSender<TranslatorCommand>,
    session: Arc<SessionState>,
    supervisor: tokio::task::JoinHandle<Session>,
}

impl PipelineHandle {
    /// Live view of the session being recorded.
    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Asks the translation side to skip its breaker cool-down and retry.
    pub fn retry_connection(&self) {
        let _ = self.command_tx.send(TranslatorCommand::RetryConnection);
    }

    /// Stops the session and waits for the drain cascade to finish.
    ///
    /// Returns the finalized session, which is always exportable regardless
    /// of how many translations succeeded.
    pub async fn stop(self) -> Result<Session> {
        let _ = self.stop_tx.send(true);
        drop(self.command_tx);
        self.supervisor.await.map_err(|e| TransliveError::Session {
            message: format!("pipeline shutdown failed: {}", e),
        })
    }
}
