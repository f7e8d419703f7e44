//! Incremental sentence segmentation over the growing transcript.
//!
//! The scanner keeps one cross-call buffer of unterminated trailing text and
//! emits exact transcript slices: concatenating every emitted sentence plus
//! the final flush reproduces the input byte for byte.
//!
//! The policy is biased toward under-splitting, since there is no re-join
//! step downstream: ambiguous terminators (decimals, initials, known
//! abbreviations, a terminator with nothing after it yet) never split.

use crate::session::{SentenceSegment, SentenceStatus};
use crate::transcribe::TranscriptionResult;
use chrono::{DateTime, Utc};

/// Words before a period that do not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "approx", "no", "fig", "vol",
];

/// Characters that may trail a terminator and still belong to the sentence.
fn is_closing(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '”' | '’' | '»' | ')' | ']')
}

fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Stateful scanner emitting complete sentences as exact input slices.
#[derive(Debug, Default)]
pub struct SentenceScanner {
    buffer: String,
}

impl SentenceScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unterminated trailing text currently held back.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Appends newly transcribed text and returns any completed sentences.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let mut sentences = Vec::new();
        while let Some(end) = find_boundary(&self.buffer) {
            let remainder = self.buffer.split_off(end);
            sentences.push(std::mem::replace(&mut self.buffer, remainder));
        }
        sentences
    }

    /// Flushes buffered text as a final sentence regardless of terminator.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.buffer))
    }
}

/// Finds the byte index one past the next confirmed sentence boundary, or
/// `None` if the buffer holds no complete sentence yet.
///
/// A boundary is a terminator (plus any closing quotes/brackets) followed by
/// whitespace. A terminator at the very end of the buffer is not confirmed:
/// the next push may reveal it was a decimal point or an abbreviation.
fn find_boundary(text: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for i in 0..chars.len() {
        let (idx, ch) = chars[i];
        if !is_terminator(ch) {
            continue;
        }
        if ch == '.' && is_guarded_period(&chars, i, idx, text) {
            continue;
        }

        // Include any run of closing quotes/brackets in the sentence.
        let mut j = i + 1;
        while j < chars.len() && is_closing(chars[j].1) {
            j += 1;
        }

        match chars.get(j) {
            // Confirmed: terminator followed by whitespace.
            Some(&(end_idx, next)) if next.is_whitespace() => return Some(end_idx),
            // Followed by something else ("3.x", "v1.2rc"): not a boundary.
            Some(_) => continue,
            // Buffer ends here: hold back until more text arrives.
            None => return None,
        }
    }
    None
}

/// Periods that are part of a decimal number, an initial, or a known
/// abbreviation.
fn is_guarded_period(chars: &[(usize, char)], i: usize, idx: usize, text: &str) -> bool {
    let prev = i.checked_sub(1).map(|p| chars[p].1);
    let next = chars.get(i + 1).map(|c| c.1);

    // Part of an ellipsis: the sentence continues past "...".
    if prev == Some('.') || next == Some('.') {
        return true;
    }

    // Decimal like "3.14".
    if prev.is_some_and(|c| c.is_ascii_digit()) && next.is_some_and(|c| c.is_ascii_digit()) {
        return true;
    }

    // Word immediately before the period.
    let word: String = text[..idx]
        .chars()
        .rev()
        .take_while(|c| c.is_alphabetic())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    // Single-letter initial ("J. Smith") or known abbreviation ("Dr.").
    word.chars().count() == 1 && word.chars().all(|c| c.is_alphabetic())
        || ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/// Turns scanner output into [`SentenceSegment`]s with monotonic ids and
/// timestamps taken from the transcription results that completed them.
pub struct SentenceAssembler {
    scanner: SentenceScanner,
    next_id: u64,
    source_language: String,
    target_language: String,
    pending_start: Option<DateTime<Utc>>,
    last_end: DateTime<Utc>,
    last_confidence: f32,
}

impl SentenceAssembler {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            scanner: SentenceScanner::new(),
            next_id: 0,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            pending_start: None,
            last_end: Utc::now(),
            last_confidence: 1.0,
        }
    }

    /// Consumes one transcription result and returns completed sentences.
    pub fn push(&mut self, result: &TranscriptionResult) -> Vec<SentenceSegment> {
        if result.text.is_empty() {
            return Vec::new();
        }
        if self.pending_start.is_none() {
            self.pending_start = Some(result.segment_start);
        }
        self.last_end = result.segment_end;
        self.last_confidence = result.confidence;

        let texts = self.scanner.push(&result.text);
        let mut sentences = Vec::new();
        for text in texts {
            let start = self.pending_start.take().unwrap_or(result.segment_start);
            sentences.push(self.make_sentence(text, start, result.segment_end, result.confidence));
        }
        if !self.scanner.pending().is_empty() && self.pending_start.is_none() {
            self.pending_start = Some(result.segment_start);
        }
        sentences
    }

    /// Flushes the trailing buffer as a final sentence on session stop.
    ///
    /// Whitespace-only remainders are dropped: they carry no content worth a
    /// sentence entry.
    pub fn flush(&mut self) -> Option<SentenceSegment> {
        let text = self.scanner.flush()?;
        if text.trim().is_empty() {
            return None;
        }
        let start = self.pending_start.take().unwrap_or(self.last_end);
        Some(self.make_sentence(text, start, self.last_end, self.last_confidence))
    }

    fn make_sentence(
        &mut self,
        text: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        confidence: f32,
    ) -> SentenceSegment {
        let id = self.next_id;
        self.next_id += 1;
        SentenceSegment {
            id,
            text,
            translated_text: None,
            start_time: start,
            end_time: end,
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            confidence,
            status: SentenceStatus::Transcribed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(chunks: &[&str]) -> (Vec<String>, Option<String>) {
        let mut scanner = SentenceScanner::new();
        let mut sentences = Vec::new();
        for chunk in chunks {
            sentences.extend(scanner.push(chunk));
        }
        (sentences, scanner.flush())
    }

    fn rejoin(sentences: &[String], flushed: &Option<String>) -> String {
        let mut out: String = sentences.concat();
        if let Some(tail) = flushed {
            out.push_str(tail);
        }
        out
    }

    #[test]
    fn test_basic_split() {
        let (sentences, flushed) = scan_all(&["Hello there. How are you? Fine!"]);
        assert_eq!(sentences, vec!["Hello there.", " How are you?"]);
        assert_eq!(flushed.as_deref(), Some(" Fine!"));
    }

    #[test]
    fn test_terminator_at_end_is_held_back() {
        let mut scanner = SentenceScanner::new();
        assert!(scanner.push("Hello there.").is_empty());
        let sentences = scanner.push(" How are you?");
        assert_eq!(sentences, vec!["Hello there."]);
        assert_eq!(scanner.pending(), " How are you?");
    }

    #[test]
    fn test_decimal_never_splits() {
        let (sentences, flushed) = scan_all(&["Pi is 3.14 roughly. Next point."]);
        assert_eq!(sentences, vec!["Pi is 3.14 roughly."]);
        assert_eq!(flushed.as_deref(), Some(" Next point."));
    }

    #[test]
    fn test_decimal_split_across_pushes() {
        // "3." arrives first; the held-back period turns out to be a decimal.
        let (sentences, flushed) = scan_all(&["Pi is 3.", "14 exactly. Done"]);
        assert_eq!(sentences, vec!["Pi is 3.14 exactly."]);
        assert_eq!(flushed.as_deref(), Some(" Done"));
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let (sentences, _) = scan_all(&["Dr. Smith met Mr. Jones today. They spoke. "]);
        assert_eq!(sentences, vec!["Dr. Smith met Mr. Jones today.", " They spoke."]);
    }

    #[test]
    fn test_single_letter_initial_does_not_split() {
        let (sentences, flushed) = scan_all(&["J. Smith arrived late. End "]);
        assert_eq!(sentences, vec!["J. Smith arrived late."]);
        assert_eq!(flushed.as_deref(), Some(" End "));
    }

    #[test]
    fn test_closing_quote_belongs_to_sentence() {
        let (sentences, flushed) = scan_all(&["She said \"stop.\" Then left. "]);
        assert_eq!(sentences, vec!["She said \"stop.\"", " Then left."]);
        assert_eq!(flushed.as_deref(), Some(" "));
    }

    #[test]
    fn test_ellipsis_stays_in_one_sentence() {
        let (sentences, _) = scan_all(&["Well... maybe. Sure thing. "]);
        assert_eq!(sentences, vec!["Well... maybe.", " Sure thing."]);
    }

    #[test]
    fn test_no_internal_terminators_in_emitted_sentences() {
        let (sentences, _) =
            scan_all(&["One. Two! Three? ", "Four. Five. "]);
        for sentence in &sentences {
            // No terminator followed by whitespace inside an emitted sentence
            // (trailing terminator is fine).
            let inner = &sentence[..sentence.len() - 1];
            assert!(
                !inner.contains(". ") && !inner.contains("! ") && !inner.contains("? "),
                "internal terminator in {:?}",
                sentence
            );
        }
    }

    #[test]
    fn test_rejoin_reproduces_input_exactly() {
        let text = "Dr. Who said \"run!\" Then 3.14 appeared. Odd... right? Yes! tail";
        // Feed in awkward chunk sizes, including splits inside words and
        // right after terminators.
        for chunk_size in [1, 2, 3, 5, 7, 11, 64] {
            let chunks: Vec<String> = text
                .chars()
                .collect::<Vec<_>>()
                .chunks(chunk_size)
                .map(|c| c.iter().collect())
                .collect();
            let chunk_refs: Vec<&str> = chunks.iter().map(|s| s.as_str()).collect();
            let (sentences, flushed) = scan_all(&chunk_refs);
            assert_eq!(
                rejoin(&sentences, &flushed),
                text,
                "chunk_size {}",
                chunk_size
            );
        }
    }

    #[test]
    fn test_flush_empty_buffer_is_none() {
        let mut scanner = SentenceScanner::new();
        assert!(scanner.flush().is_none());
        scanner.push("Done. ");
        // "Done." emitted, " " still buffered.
        assert_eq!(scanner.flush().as_deref(), Some(" "));
        assert!(scanner.flush().is_none());
    }

    mod assembler {
        use super::*;
        use chrono::Utc;
        use uuid::Uuid;

        fn result(text: &str) -> TranscriptionResult {
            TranscriptionResult {
                segment_id: Uuid::new_v4(),
                ordinal: 0,
                text: text.to_string(),
                detected_language: Some("en".to_string()),
                confidence: 0.8,
                processing_time_ms: 5,
                segment_start: Utc::now(),
                segment_end: Utc::now(),
            }
        }

        #[test]
        fn test_monotonic_ids_and_status() {
            let mut assembler = SentenceAssembler::new("en", "de");
            let sentences = assembler.push(&result("One. Two. Three"));
            assert_eq!(sentences.len(), 2);
            assert_eq!(sentences[0].id, 0);
            assert_eq!(sentences[1].id, 1);
            assert!(sentences.iter().all(|s| s.status == SentenceStatus::Transcribed));
            assert!(sentences.iter().all(|s| s.translated_text.is_none()));

            let tail = assembler.flush().expect("flush");
            assert_eq!(tail.id, 2);
            assert_eq!(tail.display_text(), "Three");
        }

        #[test]
        fn test_languages_and_confidence_propagate() {
            let mut assembler = SentenceAssembler::new("en", "ja");
            let sentences = assembler.push(&result("Hello. "));
            assert_eq!(sentences.len(), 1);
            assert_eq!(sentences[0].source_language, "en");
            assert_eq!(sentences[0].target_language, "ja");
            assert!((sentences[0].confidence - 0.8).abs() < f32::EPSILON);
        }

        #[test]
        fn test_whitespace_only_flush_dropped() {
            let mut assembler = SentenceAssembler::new("en", "de");
            let _ = assembler.push(&result("Complete. "));
            assert!(assembler.flush().is_none());
        }

        #[test]
        fn test_empty_result_ignored() {
            let mut assembler = SentenceAssembler::new("en", "de");
            assert!(assembler.push(&result("")).is_empty());
            assert!(assembler.flush().is_none());
        }
    }
}
