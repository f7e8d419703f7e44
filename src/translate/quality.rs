//! Quality gate for model-produced translations.
//!
//! Small local models fail in recognizable ways: empty output, echoing the
//! source untouched, leaking prompt instructions, or answering in the wrong
//! language. The gate rejects those so the retry ladder can try a simpler
//! prompt or another model instead of storing garbage.

use crate::translate::prompt::PROMPT_MARKERS;

/// Why a candidate translation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityIssue {
    Empty,
    TooShort,
    EchoedSource,
    LeakedInstructions,
    WrongScript,
}

impl QualityIssue {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooShort => "too-short",
            Self::EchoedSource => "echoed-source",
            Self::LeakedInstructions => "leaked-instructions",
            Self::WrongScript => "wrong-script",
        }
    }
}

/// Candidates shorter than source length times this ratio are suspicious,
/// unless the source itself is short.
const MIN_LENGTH_RATIO: f32 = 0.25;
const SHORT_SOURCE_CHARS: usize = 12;

/// Minimum share of alphabetic characters in the target script.
const MIN_SCRIPT_RATIO: f32 = 0.5;

/// Checks a candidate translation against its source.
pub fn check(source: &str, candidate: &str, target_language: &str) -> Result<(), QualityIssue> {
    let candidate = candidate.trim();
    let source = source.trim();

    if candidate.is_empty() {
        return Err(QualityIssue::Empty);
    }
    if PROMPT_MARKERS.iter().any(|m| candidate.contains(m)) {
        return Err(QualityIssue::LeakedInstructions);
    }
    if candidate.eq_ignore_ascii_case(source) {
        return Err(QualityIssue::EchoedSource);
    }

    let source_chars = source.chars().count();
    if source_chars > SHORT_SOURCE_CHARS {
        let min_chars = (source_chars as f32 * MIN_LENGTH_RATIO) as usize;
        if candidate.chars().count() < min_chars {
            return Err(QualityIssue::TooShort);
        }
    }

    let script = TargetScript::for_language(target_language);
    let alphabetic: Vec<char> = candidate.chars().filter(|c| c.is_alphabetic()).collect();
    if !alphabetic.is_empty() {
        let matching = alphabetic.iter().filter(|&&c| script.contains(c)).count();
        if (matching as f32) / (alphabetic.len() as f32) < MIN_SCRIPT_RATIO {
            return Err(QualityIssue::WrongScript);
        }
    }

    Ok(())
}

/// Writing system expected for a target language.
#[derive(Debug, Clone, Copy)]
enum TargetScript {
    Latin,
    Cyrillic,
    Cjk,
    Japanese,
    Hangul,
    Arabic,
    Hebrew,
    Greek,
    Devanagari,
}

impl TargetScript {
    fn for_language(code: &str) -> Self {
        match code {
            "ru" | "uk" | "bg" | "sr" | "mk" | "be" => Self::Cyrillic,
            "zh" => Self::Cjk,
            "ja" => Self::Japanese,
            "ko" => Self::Hangul,
            "ar" | "fa" | "ur" => Self::Arabic,
            "he" => Self::Hebrew,
            "el" => Self::Greek,
            "hi" | "mr" | "ne" => Self::Devanagari,
            // Everything else is assumed Latin-scripted; unknown codes too,
            // which errs toward accepting.
            _ => Self::Latin,
        }
    }

    fn contains(self, c: char) -> bool {
        let cp = c as u32;
        match self {
            Self::Latin => c.is_ascii_alphabetic() || (0x00C0..=0x024F).contains(&cp),
            Self::Cyrillic => (0x0400..=0x04FF).contains(&cp),
            Self::Cjk => (0x4E00..=0x9FFF).contains(&cp),
            Self::Japanese => {
                (0x3040..=0x30FF).contains(&cp) || (0x4E00..=0x9FFF).contains(&cp)
            }
            Self::Hangul => (0xAC00..=0xD7AF).contains(&cp) || (0x1100..=0x11FF).contains(&cp),
            Self::Arabic => (0x0600..=0x06FF).contains(&cp),
            Self::Hebrew => (0x0590..=0x05FF).contains(&cp),
            Self::Greek => (0x0370..=0x03FF).contains(&cp),
            Self::Devanagari => (0x0900..=0x097F).contains(&cp),
        }
    }
}
