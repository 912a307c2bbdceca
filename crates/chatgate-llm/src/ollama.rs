//! Local Ollama daemon backend.
//!
//! POSTs a non-streaming chat request to `{base_url}/api/chat`. Failures never
//! propagate: they are rendered as degraded reply text so a session on the
//! local fallback always gets an answer.

use std::time::Duration;

use async_trait::async_trait;
use chatgate_core::{CompletionError, LocalDaemonError, ProviderSelection};
use chatgate_settings::OllamaSettings;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, instrument};

use crate::backend::CompletionBackend;
use crate::error_parsing::extract_error_message;

/// Reply used when the daemon answers without message content.
pub const EMPTY_REPLY: &str = "No response from Ollama.";

/// Ollama chat backend.
#[derive(Debug)]
pub struct OllamaBackend {
    client: reqwest::Client,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OllamaBackend {
    /// Build from settings.
    pub fn new(settings: &OllamaSettings) -> Self {
        Self::with_client(settings, reqwest::Client::new())
    }

    /// Build with a shared HTTP client.
    pub fn with_client(settings: &OllamaSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout(),
        }
    }

    async fn chat(&self, prompt: &str) -> Result<String, LocalDaemonError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = json!({
            "model": self.model,
            "stream": false,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| LocalDaemonError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(LocalDaemonError::Status {
                status: status.as_u16(),
                body: extract_error_message(&body_text).map_or(body_text, |info| info.message),
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| LocalDaemonError::Decode(e.to_string()))?;

        Ok(reply
            .message
            .and_then(|m| m.content)
            .unwrap_or_else(|| EMPTY_REPLY.to_string()))
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    fn selection(&self) -> ProviderSelection {
        ProviderSelection::LocalFallback
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        debug!(prompt_len = prompt.len(), "sending Ollama request");
        match self.chat(prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                error!(error = %e, error_kind = e.kind(), "Ollama request failed");
                metrics::counter!(
                    "provider_errors_total",
                    "provider" => ProviderSelection::LocalFallback.name(),
                    "kind" => e.kind()
                )
                .increment(1);
                Ok(e.degraded_reply())
            }
        }
    }
}
