//! HTTP adapter for a local OpenAI-compatible transcription server
//! (whisper.cpp server, faster-whisper-server, and friends).

use crate::config::SpeechServiceConfig;
use crate::resilience::{FailureKind, ServiceError, ServiceId};
use crate::transcribe::engine::{SpeechEngine, SpeechOutput, SpeechRequest};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
    language: Option<String>,
}

/// Client for the `/audio/transcriptions` endpoint.
pub struct WhisperServerClient {
    client: Client,
    base_url: String,
}

impl WhisperServerClient {
    pub fn new(config: &SpeechServiceConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeechEngine for WhisperServerClient {
    async fn transcribe(
        &self,
        audio_wav: &[u8],
        request: &SpeechRequest,
    ) -> Result<SpeechOutput, ServiceError> {
        let service = ServiceId::SpeechRecognition;
        let url = format!("{}/audio/transcriptions", self.base_url);

        let file_part = Part::bytes(audio_wav.to_vec())
            .file_name("segment.wav")
            .mime_str("audio/wav")
            .map_err(|e| {
                ServiceError::new(service, FailureKind::Format, format!("audio part: {}", e))
            })?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", request.model.clone())
            .text("response_format", "json")
            .text("temperature", request.temperature.to_string());

        if let Some(context) = &request.context {
            if !context.is_empty() {
                form = form.text("prompt", context.clone());
            }
        }
        if request.language != "auto" && !request.language.is_empty() {
            form = form.text("language", request.language.clone());
        }

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(service, status, &body));
        }

        let parsed: TranscriptionResponse = response.json().await.map_err(|e| {
            ServiceError::new(
                service,
                FailureKind::Format,
                format!("transcription response parse: {}", e),
            )
        })?;

        Ok(SpeechOutput {
            text: parsed.text,
            detected_language: parsed.language,
            // The endpoint does not report confidence; treat accepted output
            // as fully confident.
            confidence: 1.0,
        })
    }
}
