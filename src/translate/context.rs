//! Rolling translation context: recent sentence pairs plus recurring
//! domain terms, both fed into translation prompts for consistency.

use std::collections::HashMap;
use std::collections::VecDeque;

/// One completed (original, translated) sentence pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SentencePair {
    pub original: String,
    pub translated: String,
}

/// Bounded window over recently translated sentences.
///
/// Also tracks how often longer words recur in the originals; words that
/// keep coming back are likely domain terminology worth translating
/// consistently.
#[derive(Debug)]
pub struct ContextWindow {
    pairs: VecDeque<SentencePair>,
    capacity: usize,
    term_counts: HashMap<String, u32>,
}

/// Words shorter than this never count as domain terms.
const MIN_TERM_LEN: usize = 5;

/// Occurrences before a word is considered a domain term.
const MIN_TERM_COUNT: u32 = 2;

impl ContextWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            pairs: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            term_counts: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Records a completed translation, evicting the oldest pair when full.
    ///
    /// Term counts accumulate over the whole session, not just the window:
    /// terminology should stay consistent even with material that scrolled
    /// out of the window.
    pub fn push(&mut self, original: &str, translated: &str) {
        for word in original.split(|c: char| !c.is_alphanumeric()) {
            if word.chars().count() >= MIN_TERM_LEN {
                *self.term_counts.entry(word.to_lowercase()).or_insert(0) += 1;
            }
        }

        if self.pairs.len() == self.capacity {
            self.pairs.pop_front();
        }
        self.pairs.push_back(SentencePair {
            original: original.to_string(),
            translated: translated.to_string(),
        });
    }

    /// The most recent `count` pairs, oldest first.
    pub fn recent_pairs(&self, count: usize) -> Vec<&SentencePair> {
        let skip = self.pairs.len().saturating_sub(count);
        self.pairs.iter().skip(skip).collect()
    }

    /// Recurring domain terms, most frequent first, capped at `limit`.
    pub fn domain_terms(&self, limit: usize) -> Vec<String> {
        let mut terms: Vec<(&String, &u32)> = self
            .term_counts
            .iter()
            .filter(|&(_, &count)| count >= MIN_TERM_COUNT)
            .collect();
        terms.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        terms.into_iter().take(limit).map(|(t, _)| t.clone()).collect()
    }
}
