//! Settings types.
//!
//! Field names are camelCase on disk. Every struct is `#[serde(default)]` so a
//! partial file only overrides what it names.

use std::fmt;
use std::time::Duration;

use chatgate_core::ProviderSelection;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatgateSettings {
    /// Network and websocket behavior.
    pub server: ServerSettings,
    /// Completion backends.
    pub providers: ProviderSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl ChatgateSettings {
    /// Reject values that would make the gateway unusable.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.server.send_queue_capacity == 0, "server.sendQueueCapacity must be positive"),
            (self.server.heartbeat_interval_ms == 0, "server.heartbeatIntervalMs must be positive"),
            (
                self.server.heartbeat_timeout_ms < self.server.heartbeat_interval_ms,
                "server.heartbeatTimeoutMs must not be shorter than the interval",
            ),
            (self.providers.openai.timeout_ms == 0, "providers.openai.timeoutMs must be positive"),
            (self.providers.ollama.timeout_ms == 0, "providers.ollama.timeoutMs must be positive"),
            (self.providers.openai.model.trim().is_empty(), "providers.openai.model is empty"),
            (self.providers.ollama.model.trim().is_empty(), "providers.ollama.model is empty"),
        ];
        match checks.into_iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(SettingsError::InvalidValue(message.to_string())),
            None => Ok(()),
        }
    }
}

/// Server network and runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` auto-assigns).
    pub port: u16,
    /// Outbound queue capacity per connection.
    pub send_queue_capacity: usize,
    /// Largest accepted inbound websocket message, in bytes.
    pub max_message_size: usize,
    /// Interval between server Ping frames.
    pub heartbeat_interval_ms: u64,
    /// Close a connection after this long without inbound activity.
    pub heartbeat_timeout_ms: u64,
    /// How long shutdown waits for tracked tasks.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            send_queue_capacity: 256,
            max_message_size: 1024 * 1024,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 60_000,
            shutdown_timeout_ms: 10_000,
        }
    }
}

/// Completion backend settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Provider every new session starts on.
    pub default_provider: ProviderSelection,
    /// Hosted provider.
    pub openai: OpenAiSettings,
    /// Local daemon provider.
    pub ollama: OllamaSettings,
}

/// Hosted provider settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenAiSettings {
    /// API credential. Absent means the hosted provider is unconfigured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Chat model name.
    pub model: String,
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Whole-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl OpenAiSettings {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_ms: 120_000,
        }
    }
}

impl fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Local daemon settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OllamaSettings {
    /// Daemon base URL, without the `/api/chat` suffix.
    pub base_url: String,
    /// Local model name.
    pub model: String,
    /// Whole-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl OllamaSettings {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://host.docker.internal:11434".to_string(),
            model: "llama3".to_string(),
            timeout_ms: 120_000,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
