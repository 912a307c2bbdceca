//! Hosted chat-completions backend.
//!
//! Sends the prompt as a single user message to `{base_url}/chat/completions`
//! with Bearer auth. Every failure is surfaced as a [`CompletionError`] so the
//! session can fail over.

use std::time::Duration;

use async_trait::async_trait;
use chatgate_core::{CompletionError, ProviderSelection};
use chatgate_settings::OpenAiSettings;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::backend::CompletionBackend;
use crate::error_parsing::{is_unavailable_status, parse_api_error};

/// `OpenAI` chat-completions backend.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiBackend {
    /// Build from settings. An absent or blank key leaves the backend
    /// unconfigured; every call then fails without touching the network.
    pub fn new(settings: &OpenAiSettings) -> Self {
        Self::with_client(settings, reqwest::Client::new())
    }

    /// Build with a shared HTTP client.
    pub fn with_client(settings: &OpenAiSettings, client: reqwest::Client) -> Self {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| SecretString::from(k.to_string()));
        Self {
            client,
            api_key,
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout(),
        }
    }

    /// Whether a credential is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn selection(&self) -> ProviderSelection {
        ProviderSelection::PrimaryHosted
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let Some(api_key) = &self.api_key else {
            return Err(CompletionError::Unconfigured);
        };

        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        debug!(prompt_len = prompt.len(), "sending OpenAI request");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let info = parse_api_error(&body_text, status.as_u16());
            warn!(
                status = status.as_u16(),
                code = info.code.as_deref().unwrap_or("unknown"),
                "OpenAI API error"
            );
            return Err(if is_unavailable_status(status.as_u16()) {
                CompletionError::Unavailable(info.message)
            } else {
                CompletionError::Provider(info.message)
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| CompletionError::Provider(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| CompletionError::Provider("response contained no message content".into()))
    }
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn settings(base_url: &str, api_key: Option<&str>) -> OpenAiSettings {
        OpenAiSettings {
            api_key: api_key.map(String::from),
            base_url: base_url.to_string(),
            ..OpenAiSettings::default()
        }
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let server = MockServer::start().await;
        let backend = OpenAiBackend::new(&settings(&server.uri(), None));
        assert!(!backend.is_configured());

        let err = backend.complete("hi").await.unwrap_err();
        assert_eq!(err, CompletionError::Unconfigured);
        assert_eq!(err.to_string(), "Missing OpenAI API key");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_key_is_unconfigured() {
        let backend = OpenAiBackend::new(&settings("http://127.0.0.1:1", Some("   ")));
        assert_matches!(backend.complete("hi").await, Err(CompletionError::Unconfigured));
    }

    #[tokio::test]
    async fn success_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hello"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hi there"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&settings(&server.uri(), Some("sk-test")));
        assert_eq!(backend.complete("hello").await.unwrap(), "Hi there");
    }

    #[tokio::test]
    async fn rate_limit_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached", "type": "requests"}
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&settings(&server.uri(), Some("sk-test")));
        let err = backend.complete("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "OpenAI unavailable: Rate limit reached");
    }

    #[tokio::test]
    async fn auth_rejection_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&settings(&server.uri(), Some("sk-bad")));
        assert_matches!(backend.complete("hello").await, Err(CompletionError::Unavailable(m)) if m == "Incorrect API key provided");
    }

    #[tokio::test]
    async fn server_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&settings(&server.uri(), Some("sk-test")));
        let err = backend.complete("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "OpenAI API error: HTTP 500: boom");
    }

    #[tokio::test]
    async fn missing_content_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&settings(&server.uri(), Some("sk-test")));
        assert_matches!(backend.complete("hello").await, Err(CompletionError::Provider(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_provider_error() {
        let backend = OpenAiBackend::new(&settings("http://127.0.0.1:1", Some("sk-test")));
        assert_matches!(backend.complete("hello").await, Err(CompletionError::Provider(_)));
    }

    #[tokio::test]
    async fn slow_response_times_out_as_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "choices": [{"message": {"role": "assistant", "content": "too late"}}]
                    }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&OpenAiSettings {
            timeout_ms: 100,
            ..settings(&server.uri(), Some("sk-test"))
        });
        assert_matches!(backend.complete("hello").await, Err(CompletionError::Provider(_)));
    }

    #[test]
    fn debug_hides_key() {
        let backend = OpenAiBackend::new(&settings("http://x", Some("sk-secret")));
        let dbg = format!("{backend:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("configured: true"));
    }
}
