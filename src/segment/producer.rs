//! Segment producer: turns a live audio source into sequential,
//! self-contained WAV segments.
//!
//! A repeating poll drains the source, tracks the current audio level, and
//! evaluates the cut policy. Each cut encodes the buffered samples as a
//! standalone WAV and queues the segment for transcription; enqueueing never
//! blocks, so capture is decoupled from engine latency.

use crate::audio::source::{AudioSource, peak_level_percent};
use crate::audio::wav::encode_wav;
use crate::defaults;
use crate::events::{EventSender, PipelineEvent};
use crate::segment::cutter::{CutDecision, CutReason, SegmentCutter};
use crate::session::SessionState;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use uuid::Uuid;

/// An immutable slice of captured audio, independently decodable.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub id: Uuid,
    pub ordinal: u64,
    /// Complete WAV file contents.
    pub audio_bytes: Vec<u8>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Configuration for the segment producer.
#[derive(Debug, Clone)]
pub struct SegmentProducerConfig {
    pub cutter: SegmentCutter,
    /// Source polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for SegmentProducerConfig {
    fn default() -> Self {
        Self {
            cutter: SegmentCutter::new(
                defaults::CHUNK_DURATION_MS,
                defaults::MAX_EXTENSION_MS,
                defaults::QUIET_THRESHOLD,
            ),
            poll_interval_ms: defaults::CAPTURE_POLL_INTERVAL_MS,
        }
    }
}

/// Produces [`AudioSegment`]s from an [`AudioSource`].
pub struct SegmentProducer<A: AudioSource> {
    source: A,
    config: SegmentProducerConfig,
    session: Arc<SessionState>,
    buffer: Vec<i16>,
    next_ordinal: u64,
    segment_started_at: DateTime<Utc>,
    last_level: f32,
}

impl<A: AudioSource + 'static> SegmentProducer<A> {
    pub fn new(source: A, config: SegmentProducerConfig, session: Arc<SessionState>) -> Self {
        Self {
            source,
            config,
            session,
            buffer: Vec::new(),
            next_ordinal: 0,
            segment_started_at: Utc::now(),
            last_level: 0.0,
        }
    }

    /// Runs the producer until stopped or the capture fails.
    ///
    /// On stop the in-flight segment is flushed (even if short) before the
    /// segment channel closes. A capture failure is terminal: it is surfaced
    /// as a `capture-failed` event and the producer exits without reopening
    /// the device.
    pub async fn run(
        mut self,
        segment_tx: mpsc::UnboundedSender<AudioSegment>,
        events: EventSender,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        if let Err(e) = self.source.start() {
            tracing::error!("audio capture failed to start: {}", e);
            events.emit(PipelineEvent::CaptureFailed {
                message: e.to_string(),
            });
            return;
        }

        let mut poll = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut segment_clock = Instant::now();
        self.segment_started_at = Utc::now();

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    match self.source.read_samples() {
                        Ok(samples) => {
                            if !samples.is_empty() {
                                self.last_level = peak_level_percent(&samples);
                                self.buffer.extend_from_slice(&samples);
                            }
                            let elapsed_ms = segment_clock.elapsed().as_millis() as u64;
                            if let CutDecision::Cut(reason) =
                                self.config.cutter.decide(elapsed_ms, self.last_level)
                            {
                                if !self.emit_segment(reason, &segment_tx, &events) {
                                    break;
                                }
                                segment_clock = Instant::now();
                                self.segment_started_at = Utc::now();
                            }
                        }
                        Err(e) => {
                            tracing::error!("audio capture failed: {}", e);
                            events.emit(PipelineEvent::CaptureFailed {
                                message: e.to_string(),
                            });
                            let _ = self.source.stop();
                            return;
                        }
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        // Final read so samples captured since the last poll are not lost.
        if let Ok(samples) = self.source.read_samples() {
            self.buffer.extend_from_slice(&samples);
        }
        self.emit_segment(CutReason::Flush, &segment_tx, &events);
        if let Err(e) = self.source.stop() {
            tracing::warn!("audio source stop failed: {}", e);
        }
        tracing::debug!("segment producer stopped");
    }

    /// Encodes and queues the buffered audio. Returns false when the segment
    /// channel is closed and the producer should stop.
    fn emit_segment(
        &mut self,
        reason: CutReason,
        segment_tx: &mpsc::UnboundedSender<AudioSegment>,
        events: &EventSender,
    ) -> bool {
        if self.buffer.is_empty() {
            return true;
        }

        let samples = std::mem::take(&mut self.buffer);
        let sample_rate = self.source.sample_rate();
        let duration_ms = (samples.len() as u64 * 1000) / sample_rate as u64;

        let audio_bytes = match encode_wav(&samples, sample_rate) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("dropping segment, WAV encoding failed: {}", e);
                return true;
            }
        };

        let segment = AudioSegment {
            id: Uuid::new_v4(),
            ordinal: self.next_ordinal,
            audio_bytes,
            start_time: self.segment_started_at,
            end_time: Utc::now(),
            duration_ms,
        };
        self.next_ordinal += 1;
        self.last_level = 0.0;

        tracing::debug!(
            ordinal = segment.ordinal,
            duration_ms,
            ?reason,
            "segment cut"
        );
        self.session.update_stats(|s| s.segments_produced += 1);
        events.emit(PipelineEvent::SegmentReady {
            segment_id: segment.id,
            ordinal: segment.ordinal,
            duration_ms,
        });

        segment_tx.send(segment).is_ok()
    }
}
