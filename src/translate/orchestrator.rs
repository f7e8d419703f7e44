//! Translation orchestrator: a single consumer translating sentences in
//! arrival order.
//!
//! Each sentence climbs a three-rung ladder until a candidate passes the
//! quality gate: full context prompt, then a bare prompt, then the alternate
//! model. A sentence that exhausts the ladder is marked `Error` and annotated
//! with the original text, so the session never loses content.
//!
//! When the translation breaker is open the orchestrator drops to fallback
//! mode: sentences pass through untranslated in `Transcribed` status and no
//! calls are made until the cool-down (or an explicit retry command) admits
//! a trial.

use crate::config::SessionOptions;
use crate::defaults;
use crate::events::{EventSender, PipelineEvent};
use crate::resilience::{ResilientClient, ServiceId};
use crate::session::{SentenceStatus, SessionState};
use crate::translate::context::ContextWindow;
use crate::translate::llm::{GenerateRequest, LanguageModel, ModelTier};
use crate::translate::prompt::{ContentClass, PromptBuilder};
use crate::translate::quality;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Control commands accepted while the orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorCommand {
    /// Skip the breaker cool-down and perform the trial on the next sentence.
    RetryConnection,
}

pub struct TranslationOrchestrator<M: LanguageModel> {
    model: Arc<M>,
    client: ResilientClient,
    prompts: PromptBuilder,
    window: ContextWindow,
    target_language: String,
    max_attempts: u32,
    session: Arc<SessionState>,
    events: EventSender,
    fallback_active: bool,
}

impl<M: LanguageModel + 'static> TranslationOrchestrator<M> {
    pub fn new(
        model: Arc<M>,
        options: &SessionOptions,
        session: Arc<SessionState>,
        events: EventSender,
    ) -> Self {
        Self {
            model,
            client: ResilientClient::new(ServiceId::Translation, options, events.clone()),
            prompts: PromptBuilder::new(
                &options.source_language,
                &options.target_language,
                defaults::PROMPT_CONTEXT_PAIRS,
            ),
            window: ContextWindow::new(options.context_pairs),
            target_language: options.target_language.clone(),
            max_attempts: options.max_translation_attempts,
            session,
            events,
            fallback_active: false,
        }
    }

    /// Drains the sentence queue until it closes, handling control commands
    /// in between.
    pub async fn run(
        mut self,
        mut sentence_rx: mpsc::UnboundedReceiver<u64>,
        mut command_rx: mpsc::UnboundedReceiver<TranslatorCommand>,
    ) {
        let mut commands_open = true;
        loop {
            tokio::select! {
                command = command_rx.recv(), if commands_open => match command {
                    Some(TranslatorCommand::RetryConnection) => {
                        tracing::info!("manual retry requested; forcing breaker trial");
                        self.client.force_trial();
                    }
                    None => commands_open = false,
                },
                sentence_id = sentence_rx.recv() => match sentence_id {
                    Some(id) => self.handle_sentence(id).await,
                    None => break,
                },
            }
        }
        tracing::debug!("translation orchestrator drained");
    }

    /// Translates one sentence by id, or passes it through in fallback mode.
    async fn handle_sentence(&mut self, id: u64) {
        let Some(sentence) = self.session.sentence(id) else {
            tracing::warn!(id, "sentence not found in session");
            return;
        };
        // Already handled (terminal or in flight): translating again would
        // only burn service calls for the same answer.
        if sentence.status != SentenceStatus::Transcribed {
            return;
        }

        if !self.client.available() {
            self.set_fallback(true);
            return;
        }

        self.mark(id, |s| s.status = SentenceStatus::Translating);

        let source = sentence.display_text().to_string();
        match self.climb_ladder(&source).await {
            LadderOutcome::Accepted(translated) => {
                self.set_fallback(false);
                self.window.push(&source, &translated);
                self.session.update_stats(|s| s.sentences_translated += 1);
                self.mark(id, |s| {
                    s.status = SentenceStatus::Translated;
                    s.translated_text = Some(translated);
                });
            }
            LadderOutcome::Exhausted => {
                self.session.update_stats(|s| s.sentences_failed += 1);
                let annotated = format!("{}{}", defaults::UNTRANSLATED_PREFIX, source);
                self.mark(id, |s| {
                    s.status = SentenceStatus::Error;
                    s.translated_text = Some(annotated);
                });
            }
            LadderOutcome::ServiceDown => {
                // Back to transcribed; the sentence reads untranslated like
                // every other fallback sentence.
                self.mark(id, |s| s.status = SentenceStatus::Transcribed);
                self.set_fallback(true);
            }
        }
    }

    /// Runs the attempt ladder for one sentence.
    async fn climb_ladder(&mut self, source: &str) -> LadderOutcome {
        let class = ContentClass::classify(source);

        for rung in 1..=self.max_attempts {
            let prompt = match rung {
                1 => self.prompts.full_prompt(source, class, &self.window),
                _ => self.prompts.bare_prompt(source),
            };
            let tier = if rung >= 3 {
                ModelTier::Alternate
            } else {
                ModelTier::Primary
            };

            let model = Arc::clone(&self.model);
            let result = self
                .client
                .call(|_| {
                    let model = Arc::clone(&model);
                    let request = GenerateRequest {
                        prompt: prompt.clone(),
                        tier,
                    };
                    async move { model.generate(&request).await }
                })
                .await;

            match result {
                Ok(candidate) => match quality::check(source, &candidate, &self.target_language) {
                    Ok(()) => return LadderOutcome::Accepted(candidate.trim().to_string()),
                    Err(issue) => {
                        tracing::debug!(rung, issue = issue.as_str(), "translation rejected");
                    }
                },
                Err(error) if error.is_short_circuit() => return LadderOutcome::ServiceDown,
                Err(error) => {
                    tracing::debug!(rung, "translation attempt failed: {}", error);
                    if !self.client.available() {
                        return LadderOutcome::ServiceDown;
                    }
                }
            }
        }
        LadderOutcome::Exhausted
    }

    /// Applies a sentence mutation and publishes the updated copy.
    fn mark<F>(&self, id: u64, mutate: F)
    where
        F: FnOnce(&mut crate::session::SentenceSegment),
    {
        if let Some(updated) = self.session.update_sentence(id, mutate) {
            self.events.emit(PipelineEvent::SentenceUpdate(updated));
        }
    }

    fn set_fallback(&mut self, active: bool) {
        if self.fallback_active == active {
            return;
        }
        self.fallback_active = active;
        if active {
            tracing::warn!("translation unavailable; continuing transcription-only");
            self.session.update_stats(|s| s.fallback_entries += 1);
        } else {
            tracing::info!("translation recovered; leaving fallback mode");
        }
        self.events.emit(PipelineEvent::FallbackModeChanged { active });
    }
}

enum LadderOutcome {
    Accepted(String),
    Exhausted,
    ServiceDown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitStateKind, FailureKind};
    use crate::session::SentenceSegment;
    use crate::translate::llm::MockLanguageModel;
    use chrono::Utc;

    fn make_sentence(id: u64, text: &str) -> SentenceSegment {
        SentenceSegment {
            id,
            text: text.to_string(),
            translated_text: None,
            start_time: Utc::now(),
            end_time: Utc::now(),
            source_language: "en".to_string(),
            target_language: "de".to_string(),
            confidence: 0.9,
            status: SentenceStatus::Transcribed,
        }
    }

    fn options() -> SessionOptions {
        SessionOptions {
            target_language: "de".to_string(),
            ..Default::default()
        }
    }

    struct Fixture {
        orchestrator: TranslationOrchestrator<MockLanguageModel>,
        session: Arc<SessionState>,
        events: mpsc::UnboundedReceiver<PipelineEvent>,
    }

    fn fixture(model: MockLanguageModel, options: &SessionOptions) -> Fixture {
        let (events, rx) = EventSender::channel();
        let session = Arc::new(SessionState::new(options));
        let orchestrator =
            TranslationOrchestrator::new(Arc::new(model), options, session.clone(), events);
        Fixture {
            orchestrator,
            session,
            events: rx,
        }
    }

    #[tokio::test]
    async fn test_first_rung_success() {
        let model = MockLanguageModel::new().with_responses(&["Hallo, wie geht es dir?"]);
        let probe = model.clone();
        let mut fx = fixture(model, &options());

        fx.session.push_sentence(make_sentence(0, "Hello, how are you?"));
        fx.orchestrator.handle_sentence(0).await;

        let sentence = fx.session.sentence(0).expect("sentence");
        assert_eq!(sentence.status, SentenceStatus::Translated);
        assert_eq!(sentence.translated_text.as_deref(), Some("Hallo, wie geht es dir?"));
        assert_eq!(probe.call_count(), 1);
        // First rung uses the full prompt.
        assert!(probe.requests()[0].prompt.contains("Text to translate"));
        assert_eq!(fx.session.stats().sentences_translated, 1);
    }

    #[tokio::test]
    async fn test_quality_rejection_falls_to_bare_prompt() {
        // First reply echoes the source, second is a real translation.
        let model = MockLanguageModel::new()
            .with_responses(&["Hello, how are you?", "Hallo, wie geht es dir?"]);
        let probe = model.clone();
        let mut fx = fixture(model, &options());

        fx.session.push_sentence(make_sentence(0, "Hello, how are you?"));
        fx.orchestrator.handle_sentence(0).await;

        let sentence = fx.session.sentence(0).expect("sentence");
        assert_eq!(sentence.status, SentenceStatus::Translated);

        let requests = probe.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[1].prompt.contains("###"));
        assert_eq!(requests[1].tier, ModelTier::Primary);
    }

    #[tokio::test]
    async fn test_third_rung_uses_alternate_model() {
        let model = MockLanguageModel::new()
            .with_responses(&["", "", "Hallo, wie geht es dir?"]);
        let probe = model.clone();
        let mut fx = fixture(model, &options());

        fx.session.push_sentence(make_sentence(0, "Hello, how are you?"));
        fx.orchestrator.handle_sentence(0).await;

        assert_eq!(
            fx.session.sentence(0).expect("sentence").status,
            SentenceStatus::Translated
        );
        let requests = probe.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].tier, ModelTier::Alternate);
    }

    #[tokio::test]
    async fn test_ladder_exhaustion_annotates_original() {
        let model = MockLanguageModel::new().with_default_response("");
        let mut fx = fixture(model, &options());

        fx.session.push_sentence(make_sentence(0, "Hello, how are you?"));
        fx.orchestrator.handle_sentence(0).await;

        let sentence = fx.session.sentence(0).expect("sentence");
        assert_eq!(sentence.status, SentenceStatus::Error);
        assert_eq!(
            sentence.translated_text.as_deref(),
            Some("[untranslated] Hello, how are you?")
        );
        assert_eq!(fx.session.stats().sentences_failed, 1);
    }

    #[tokio::test]
    async fn test_terminal_sentences_are_skipped() {
        let model = MockLanguageModel::new();
        let probe = model.clone();
        let mut fx = fixture(model, &options());

        let mut sentence = make_sentence(0, "Hello there.");
        sentence.status = SentenceStatus::Translated;
        sentence.translated_text = Some("Hallo.".to_string());
        fx.session.push_sentence(sentence);

        fx.orchestrator.handle_sentence(0).await;
        assert_eq!(probe.call_count(), 0);
        assert_eq!(
            fx.session.sentence(0).expect("sentence").translated_text.as_deref(),
            Some("Hallo.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_enters_fallback_without_calls() {
        let model = MockLanguageModel::new()
            .with_failure(FailureKind::ServiceUnavailable)
            .with_default_response("Hallo zusammen, alles gut?");
        let probe = model.clone();
        let mut fx = fixture(
            model,
            &SessionOptions {
                circuit_breaker_threshold: 1,
                ..options()
            },
        );

        fx.session.push_sentence(make_sentence(0, "Hello everyone, all good?"));
        fx.session.push_sentence(make_sentence(1, "Another sentence arrives."));
        fx.orchestrator.handle_sentence(0).await;
        fx.orchestrator.handle_sentence(1).await;

        // The failing call opened the breaker; both sentences end up
        // untranslated in transcribed state and the second never hit the
        // service.
        assert_eq!(probe.call_count(), 1);
        for id in [0, 1] {
            let sentence = fx.session.sentence(id).expect("sentence");
            assert_eq!(sentence.status, SentenceStatus::Transcribed);
            assert!(sentence.translated_text.is_none());
        }
        assert_eq!(fx.session.stats().fallback_entries, 1);

        let mut saw_fallback = false;
        while let Ok(event) = fx.events.try_recv() {
            if let PipelineEvent::FallbackModeChanged { active } = event {
                assert!(active);
                saw_fallback = true;
            }
        }
        assert!(saw_fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_command_restores_translation() {
        let model = MockLanguageModel::new()
            .with_failure(FailureKind::Connection)
            .with_failure(FailureKind::Connection)
            .with_default_response("Hallo zusammen, wie geht es?");
        let probe = model.clone();
        let opts = SessionOptions {
            circuit_breaker_threshold: 2,
            max_retries: 3,
            circuit_breaker_cooldown_ms: 600_000,
            ..options()
        };
        let mut fx = fixture(model, &opts);
        let session = fx.session.clone();

        session.push_sentence(make_sentence(0, "Hello everyone, how is it going?"));
        session.push_sentence(make_sentence(1, "Hello again everyone, still here?"));

        let (sentence_tx, sentence_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(fx.orchestrator.run(sentence_rx, command_rx));

        // First sentence trips the breaker (2 connection failures reach the
        // threshold before the retry budget ends).
        sentence_tx.send(0).expect("send");
        loop {
            match fx.events.recv().await.expect("event") {
                PipelineEvent::FallbackModeChanged { active: true } => break,
                _ => continue,
            }
        }

        // Manual retry moves the breaker to half-open, then the second
        // sentence performs the trial call and translates.
        command_tx.send(TranslatorCommand::RetryConnection).expect("send");
        loop {
            match fx.events.recv().await.expect("event") {
                PipelineEvent::CircuitBreakerStateChanged { state, .. }
                    if state == CircuitStateKind::HalfOpen =>
                {
                    break;
                }
                _ => continue,
            }
        }
        sentence_tx.send(1).expect("send");
        drop(sentence_tx);
        drop(command_tx);
        task.await.expect("join");

        assert_eq!(
            session.sentence(1).expect("sentence").status,
            SentenceStatus::Translated
        );
        assert_eq!(probe.call_count(), 3);
    }

    #[tokio::test]
    async fn test_context_window_feeds_later_prompts() {
        let model = MockLanguageModel::new()
            .with_responses(&["Die Pipeline ist fertig.", "Starte sie jetzt neu."]);
        let probe = model.clone();
        let mut fx = fixture(model, &options());

        fx.session.push_sentence(make_sentence(0, "The pipeline has finished."));
        fx.session.push_sentence(make_sentence(1, "Now restart it, please."));
        fx.orchestrator.handle_sentence(0).await;
        fx.orchestrator.handle_sentence(1).await;

        let requests = probe.requests();
        assert!(requests[1].prompt.contains("Die Pipeline ist fertig."));
    }
}
