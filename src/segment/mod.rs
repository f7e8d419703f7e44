//! Segment production: smart cut-point detection over a live audio source.

pub mod cutter;
pub mod producer;

pub use cutter::{CutDecision, CutReason, SegmentCutter};
pub use producer::{AudioSegment, SegmentProducer, SegmentProducerConfig};
