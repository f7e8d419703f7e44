//! Translation: prompt construction, quality gating, and the orchestrator
//! that drives the language model.

pub mod context;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod quality;

pub use context::{ContextWindow, SentencePair};
pub use llm::{GenerateRequest, LanguageModel, MockLanguageModel, ModelTier, OllamaClient};
pub use orchestrator::{TranslationOrchestrator, TranslatorCommand};
pub use prompt::{ContentClass, PromptBuilder};
pub use quality::QualityIssue;
