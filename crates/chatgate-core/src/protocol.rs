//! Client wire protocol.
//!
//! Every frame in both directions is plain text. Inbound text is either a
//! provider-switch command or a chat prompt; outbound text is one of a fixed
//! set of notices or an assistant reply.

use std::fmt;

use crate::provider::ProviderSelection;

/// Prefix of the provider-switch control command. The trailing space is part
/// of the prefix.
pub const USE_PREFIX: &str = "/use ";

/// Role marker prepended to every completion sent back to a client.
pub const ASSISTANT_PREFIX: &str = "assistant: ";

/// Classified inbound text frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// `/use <known provider>`.
    SwitchProvider(ProviderSelection),
    /// `/use <anything else>`. Carries the normalized remainder.
    InvalidProvider(String),
    /// Anything not starting with [`USE_PREFIX`], verbatim.
    Prompt(&'a str),
}

impl<'a> Inbound<'a> {
    /// Classify a text frame. Prompts are passed through untouched, including
    /// empty and whitespace-only text.
    pub fn parse(text: &'a str) -> Self {
        match text.strip_prefix(USE_PREFIX) {
            Some(rest) => match rest.parse::<ProviderSelection>() {
                Ok(provider) => Self::SwitchProvider(provider),
                Err(err) => Self::InvalidProvider(err.0),
            },
            None => Self::Prompt(text),
        }
    }
}

/// Outbound text frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// First message on every connection.
    Connected(ProviderSelection),
    /// `/use` accepted.
    Switched(ProviderSelection),
    /// `/use` rejected.
    InvalidProvider,
    /// The hosted provider failed and the session moved to the local fallback.
    FailedOver {
        /// Rendered failure detail.
        detail: String,
    },
    /// A completion (or degraded local-daemon text).
    Assistant(String),
}

impl fmt::Display for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected(p) => write!(f, "✅ Connected. Current provider: {}", p.label()),
            Self::Switched(p) => write!(f, "🔄 Switched to {} mode.", p.label()),
            Self::InvalidProvider => {
                f.write_str("❌ Invalid provider. Use /use openai or /use ollama.")
            }
            Self::FailedOver { detail } => write!(
                f,
                "⚠️ OpenAI failed, switched to {}. ({detail})",
                ProviderSelection::LocalFallback.label()
            ),
            Self::Assistant(text) => write!(f, "{ASSISTANT_PREFIX}{text}"),
        }
    }
}
