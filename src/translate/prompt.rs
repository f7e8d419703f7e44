//! Prompt construction for the translation model.
//!
//! Two prompt shapes exist: the full prompt with context and style guidance,
//! and a stripped-down bare prompt used when the full prompt failed the
//! quality gate (small models sometimes echo instructions back; fewer
//! instructions means fewer ways to fail).

use crate::translate::context::ContextWindow;

/// Section markers used in the full prompt. A translation containing any of
/// these leaked instruction text and fails the quality gate.
pub const PROMPT_MARKERS: &[&str] = &["### ", "Translation:", "Text to translate:"];

const TECHNICAL_KEYWORDS: &[&str] = &[
    "server", "database", "function", "deploy", "compile", "protocol", "api", "config", "kernel",
    "cluster", "latency", "endpoint", "runtime", "thread", "pipeline",
];

const CONVERSATIONAL_KEYWORDS: &[&str] = &[
    "hey", "yeah", "okay", "thanks", "please", "sorry", "wow", "hmm", "gonna", "wanna",
];

/// Coarse content classification steering translation style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Technical,
    Conversational,
    Standard,
}

impl ContentClass {
    /// Classifies a sentence by keyword occurrence. Ties go to technical:
    /// mistranslated terminology hurts more than a slightly stiff register.
    pub fn classify(text: &str) -> Self {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let technical = words.iter().filter(|w| TECHNICAL_KEYWORDS.contains(w)).count();
        let conversational = words
            .iter()
            .filter(|w| CONVERSATIONAL_KEYWORDS.contains(w))
            .count();

        if technical > 0 && technical >= conversational {
            Self::Technical
        } else if conversational > 0 {
            Self::Conversational
        } else {
            Self::Standard
        }
    }

    fn style_instruction(self) -> &'static str {
        match self {
            Self::Technical => {
                "Preserve technical terms, product names, and code identifiers exactly; \
                 do not translate them."
            }
            Self::Conversational => {
                "Keep the casual, spoken tone. Prefer natural colloquial phrasing over \
                 literal translation."
            }
            Self::Standard => "Preserve the tone and register of the original.",
        }
    }
}

/// Builds translation prompts for one session's language pair.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    source_language: String,
    target_language: String,
    context_pairs: usize,
}

impl PromptBuilder {
    pub fn new(source_language: &str, target_language: &str, context_pairs: usize) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            context_pairs,
        }
    }

    fn language_clause(&self) -> String {
        if self.source_language == "auto" {
            format!("into {}", language_name(&self.target_language))
        } else {
            format!(
                "from {} into {}",
                language_name(&self.source_language),
                language_name(&self.target_language)
            )
        }
    }

    /// Full prompt: style guidance, recent pairs, domain terms, sentence.
    pub fn full_prompt(&self, text: &str, class: ContentClass, window: &ContextWindow) -> String {
        let mut prompt = format!(
            "You are translating a live speech transcript {}. {}\n\
             Respond with only the translated sentence, nothing else.\n",
            self.language_clause(),
            class.style_instruction(),
        );

        let pairs = window.recent_pairs(self.context_pairs);
        if !pairs.is_empty() {
            prompt.push_str("\n### Preceding sentences (for context only):\n");
            for pair in pairs {
                prompt.push_str(&format!("{}\n=> {}\n", pair.original.trim(), pair.translated));
            }
        }

        let terms = window.domain_terms(8);
        if !terms.is_empty() {
            prompt.push_str(&format!(
                "\n### Recurring terms, translate consistently: {}\n",
                terms.join(", ")
            ));
        }

        prompt.push_str(&format!("\n### Text to translate:\n{}\n\nTranslation:", text.trim()));
        prompt
    }

    /// Bare prompt: no context, no sections, one instruction.
    pub fn bare_prompt(&self, text: &str) -> String {
        format!(
            "Translate {} and reply with only the translation:\n{}",
            self.language_clause(),
            text.trim()
        )
    }
}

/// Human-readable name for common language codes; unknown codes pass through.
fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "pl" => "Polish",
        "cs" => "Czech",
        "uk" => "Ukrainian",
        "ru" => "Russian",
        "bg" => "Bulgarian",
        "sr" => "Serbian",
        "el" => "Greek",
        "tr" => "Turkish",
        "ar" => "Arabic",
        "he" => "Hebrew",
        "hi" => "Hindi",
        "zh" => "Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        other => other,
    }
}
