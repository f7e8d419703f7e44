//! Cut-point decision for the segment producer.
//!
//! A pure function of elapsed time and the current audio level, so the
//! producer's timing behavior is testable without a device or a clock.

use crate::config::SessionOptions;
use crate::defaults;

/// Why a segment was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutReason {
    /// The audio level was below the quiet threshold at or after the segment
    /// boundary.
    Quiet,
    /// The deferral window ran out; cut forced regardless of level.
    ExtensionLimit,
    /// The session stopped; in-flight audio flushed.
    Flush,
}

/// Outcome of evaluating the current position against the cut policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutDecision {
    Hold,
    Cut(CutReason),
}

impl CutDecision {
    pub fn is_cut(&self) -> bool {
        matches!(self, CutDecision::Cut(_))
    }
}

/// Cut policy: cut at the segment boundary as soon as the audio is quiet,
/// deferring up to `max_extension_ms` to avoid mid-word cuts.
#[derive(Debug, Clone)]
pub struct SegmentCutter {
    chunk_duration_ms: u64,
    max_extension_ms: u64,
    quiet_threshold: f32,
}

impl SegmentCutter {
    pub fn new(chunk_duration_ms: u64, max_extension_ms: u64, quiet_threshold: f32) -> Self {
        Self {
            chunk_duration_ms: chunk_duration_ms
                .clamp(defaults::MIN_CHUNK_DURATION_MS, defaults::MAX_CHUNK_DURATION_MS),
            max_extension_ms,
            quiet_threshold,
        }
    }

    pub fn from_options(options: &SessionOptions) -> Self {
        Self::new(
            options.chunk_duration_ms,
            options.max_extension_ms,
            options.quiet_threshold,
        )
    }

    /// Evaluates the cut policy at `elapsed_ms` into the current segment,
    /// given the most recent audio level in percent.
    pub fn decide(&self, elapsed_ms: u64, level_percent: f32) -> CutDecision {
        if elapsed_ms < self.chunk_duration_ms {
            return CutDecision::Hold;
        }
        if level_percent < self.quiet_threshold {
            return CutDecision::Cut(CutReason::Quiet);
        }
        if elapsed_ms >= self.chunk_duration_ms + self.max_extension_ms {
            return CutDecision::Cut(CutReason::ExtensionLimit);
        }
        CutDecision::Hold
    }

    /// Worst-case segment length in milliseconds.
    pub fn max_segment_ms(&self) -> u64 {
        self.chunk_duration_ms + self.max_extension_ms
    }
}
