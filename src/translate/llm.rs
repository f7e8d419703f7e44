//! Language-model abstraction and the Ollama-compatible HTTP client.

use crate::config::LlmServiceConfig;
use crate::resilience::{FailureKind, ServiceError, ServiceId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Which configured model to run a generation on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Primary,
    Alternate,
}

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub tier: ModelTier,
}

/// Trait for the external text-generation service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ServiceError>;
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Client for the Ollama `/api/generate` endpoint.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    model_alternate: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(config: &LlmServiceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            model_alternate: config.model_alternate.clone(),
            temperature: config.temperature,
        }
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Primary => &self.model,
            ModelTier::Alternate => &self.model_alternate,
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ServiceError> {
        let service = ServiceId::Translation;
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaRequest {
            model: self.model_for(request.tier),
            prompt: &request.prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                // Translations are roughly source-length; a hard ceiling stops
                // runaway generations from a confused model.
                num_predict: 512,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(service, status, &text));
        }

        let parsed: OllamaResponse = response.json().await.map_err(|e| {
            ServiceError::new(
                service,
                FailureKind::Format,
                format!("generate response parse: {}", e),
            )
        })?;
        Ok(parsed.response)
    }
}

/// One scripted reply of the mock model.
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Failure(FailureKind),
}

struct MockState {
    script: VecDeque<MockReply>,
    requests: Vec<GenerateRequest>,
}

/// Mock language model for testing: plays back a reply script and records
/// every prompt it receives.
#[derive(Clone)]
pub struct MockLanguageModel {
    state: Arc<Mutex<MockState>>,
    default_response: String,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                script: VecDeque::new(),
                requests: Vec::new(),
            })),
            default_response: "mock translation".to_string(),
        }
    }

    pub fn with_default_response(mut self, text: &str) -> Self {
        self.default_response = text.to_string();
        self
    }

    pub fn with_responses(self, texts: &[&str]) -> Self {
        {
            let mut state = self.lock();
            for text in texts {
                state.script.push_back(MockReply::Text(text.to_string()));
            }
        }
        self
    }

    pub fn with_failure(self, kind: FailureKind) -> Self {
        self.lock().script.push_back(MockReply::Failure(kind));
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ServiceError> {
        let reply = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.script.pop_front()
        };

        match reply {
            Some(MockReply::Failure(kind)) => Err(ServiceError::new(
                ServiceId::Translation,
                kind,
                "mock generation failure",
            )),
            Some(MockReply::Text(text)) => Ok(text),
            None => Ok(self.default_response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: prompt.to_string(),
            tier: ModelTier::Primary,
        }
    }

    #[test]
    fn test_ollama_model_selection() {
        let client = OllamaClient::new(&LlmServiceConfig::default());
        assert_eq!(client.model_for(ModelTier::Primary), "qwen2.5:1.5b");
        assert_eq!(client.model_for(ModelTier::Alternate), "llama3.2");
    }

    #[test]
    fn test_ollama_base_url_trimmed() {
        let config = LlmServiceConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..Default::default()
        };
        let client = OllamaClient::new(&config);
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_generate_request_serialization() {
        let body = OllamaRequest {
            model: "qwen2.5:1.5b",
            prompt: "translate this",
            stream: false,
            options: OllamaOptions {
                temperature: 0.3,
                num_predict: 512,
            },
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["model"], "qwen2.5:1.5b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 512);
    }

    #[tokio::test]
    async fn test_mock_script_and_recording() {
        let model = MockLanguageModel::new()
            .with_responses(&["Hallo."])
            .with_failure(FailureKind::Timeout)
            .with_default_response("rest");

        assert_eq!(model.generate(&request("a")).await.expect("ok"), "Hallo.");
        let err = model.generate(&request("b")).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Timeout);
        assert_eq!(model.generate(&request("c")).await.expect("ok"), "rest");

        let seen = model.requests();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].prompt, "a");
        assert_eq!(seen[2].tier, ModelTier::Primary);
    }
}
