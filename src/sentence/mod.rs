//! Sentence segmentation of the ongoing transcript.

pub mod segmenter;

pub use segmenter::{SentenceAssembler, SentenceScanner};
