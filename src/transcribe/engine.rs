//! Speech-recognition engine abstraction.
//!
//! The engine is a batch service: one self-contained audio file in, one
//! recognized text out. This trait allows swapping implementations (real
//! HTTP server vs mock).

use crate::config::{SessionOptions, SpeechServiceConfig};
use crate::resilience::{Attempt, FailureKind, ServiceError, ServiceId};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Engine parameters fixed at session start.
#[derive(Debug, Clone)]
pub struct SpeechParams {
    pub model: String,
    pub model_reduced: String,
    pub language: String,
    pub temperature: f32,
}

impl SpeechParams {
    pub fn new(config: &SpeechServiceConfig, options: &SessionOptions) -> Self {
        Self {
            model: config.model.clone(),
            model_reduced: config.model_reduced.clone(),
            language: options.source_language.clone(),
            temperature: config.temperature,
        }
    }
}

/// One concrete transcription request, resolved for a specific attempt.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub model: String,
    pub language: String,
    pub temperature: f32,
    /// Trailing transcript text biasing the engine toward continuity.
    pub context: Option<String>,
}

impl SpeechRequest {
    /// Resolves the request for an attempt: resource recovery selects the
    /// reduced model, configuration recovery drops custom parameters.
    pub fn for_attempt(params: &SpeechParams, attempt: Attempt, context: Option<String>) -> Self {
        if attempt.use_defaults {
            return Self {
                model: params.model.clone(),
                language: "auto".to_string(),
                temperature: 0.0,
                context: None,
            };
        }
        Self {
            model: if attempt.reduced_quality {
                params.model_reduced.clone()
            } else {
                params.model.clone()
            },
            language: params.language.clone(),
            temperature: params.temperature,
            context,
        }
    }
}

/// Recognized text for one audio segment.
#[derive(Debug, Clone)]
pub struct SpeechOutput {
    pub text: String,
    pub detected_language: Option<String>,
    pub confidence: f32,
}

/// Trait for the external speech-recognition service.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Transcribes a complete WAV file.
    async fn transcribe(
        &self,
        audio_wav: &[u8],
        request: &SpeechRequest,
    ) -> Result<SpeechOutput, ServiceError>;
}

/// One scripted reply of the mock engine.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Failure(FailureKind),
}

struct MockState {
    script: VecDeque<MockReply>,
    latencies_ms: VecDeque<u64>,
    requests: Vec<SpeechRequest>,
    calls: u64,
}

/// Mock speech engine for testing.
///
/// Plays back a script of replies and records every request it receives.
#[derive(Clone)]
pub struct MockSpeechEngine {
    state: Arc<Mutex<MockState>>,
    default_response: String,
}

impl MockSpeechEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                script: VecDeque::new(),
                latencies_ms: VecDeque::new(),
                requests: Vec::new(),
                calls: 0,
            })),
            default_response: "mock transcription".to_string(),
        }
    }

    /// Response returned once the script is exhausted.
    pub fn with_default_response(mut self, text: &str) -> Self {
        self.default_response = text.to_string();
        self
    }

    /// Queues successful replies, one per call.
    pub fn with_responses(self, texts: &[&str]) -> Self {
        {
            let mut state = self.lock();
            for text in texts {
                state.script.push_back(MockReply::Text(text.to_string()));
            }
        }
        self
    }

    /// Queues a classified failure reply.
    pub fn with_failure(self, kind: FailureKind) -> Self {
        self.lock().script.push_back(MockReply::Failure(kind));
        self
    }

    /// Queues per-call latencies, consumed in order.
    pub fn with_latencies_ms(self, latencies: &[u64]) -> Self {
        {
            let mut state = self.lock();
            for ms in latencies {
                state.latencies_ms.push_back(*ms);
            }
        }
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> u64 {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MockSpeechEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechEngine for MockSpeechEngine {
    async fn transcribe(
        &self,
        _audio_wav: &[u8],
        request: &SpeechRequest,
    ) -> Result<SpeechOutput, ServiceError> {
        let (reply, latency) = {
            let mut state = self.lock();
            state.calls += 1;
            state.requests.push(request.clone());
            (state.script.pop_front(), state.latencies_ms.pop_front())
        };

        if let Some(ms) = latency {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }

        match reply {
            Some(MockReply::Failure(kind)) => Err(ServiceError::new(
                ServiceId::SpeechRecognition,
                kind,
                "mock transcription failure",
            )),
            Some(MockReply::Text(text)) => Ok(SpeechOutput {
                text,
                detected_language: Some("en".to_string()),
                confidence: 0.9,
            }),
            None => Ok(SpeechOutput {
                text: self.default_response.clone(),
                detected_language: Some("en".to_string()),
                confidence: 0.9,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SpeechRequest {
        SpeechRequest {
            model: "whisper-base".to_string(),
            language: "en".to_string(),
            temperature: 0.0,
            context: None,
        }
    }

    #[tokio::test]
    async fn test_mock_plays_script_then_default() {
        let engine = MockSpeechEngine::new()
            .with_responses(&["first", "second"])
            .with_default_response("rest");

        let out = engine.transcribe(&[], &request()).await.expect("ok");
        assert_eq!(out.text, "first");
        let out = engine.transcribe(&[], &request()).await.expect("ok");
        assert_eq!(out.text, "second");
        let out = engine.transcribe(&[], &request()).await.expect("ok");
        assert_eq!(out.text, "rest");
        assert_eq!(engine.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure_reply() {
        let engine = MockSpeechEngine::new().with_failure(FailureKind::Timeout);
        let result = engine.transcribe(&[], &request()).await;
        assert_eq!(result.unwrap_err().kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let engine = MockSpeechEngine::new();
        let mut req = request();
        req.context = Some("previous text".to_string());
        let _ = engine.transcribe(&[], &req).await;

        let seen = engine.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].context.as_deref(), Some("previous text"));
    }

    #[test]
    fn test_request_for_attempt_reduced_quality() {
        let params = SpeechParams {
            model: "whisper-base".to_string(),
            model_reduced: "whisper-tiny".to_string(),
            language: "de".to_string(),
            temperature: 0.2,
        };

        let normal = SpeechRequest::for_attempt(
            &params,
            Attempt {
                number: 1,
                reduced_quality: false,
                use_defaults: false,
            },
            Some("ctx".to_string()),
        );
        assert_eq!(normal.model, "whisper-base");
        assert_eq!(normal.language, "de");

        let reduced = SpeechRequest::for_attempt(
            &params,
            Attempt {
                number: 2,
                reduced_quality: true,
                use_defaults: false,
            },
            None,
        );
        assert_eq!(reduced.model, "whisper-tiny");

        let defaults = SpeechRequest::for_attempt(
            &params,
            Attempt {
                number: 2,
                reduced_quality: false,
                use_defaults: true,
            },
            Some("ctx".to_string()),
        );
        assert_eq!(defaults.language, "auto");
        assert!(defaults.context.is_none());
    }
}
