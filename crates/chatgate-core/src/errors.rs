//! Error taxonomy for completion backends.
//!
//! - [`CompletionError`]: hard failures of the hosted provider. The session
//!   reacts to every variant by failing over to the local daemon.
//! - [`LocalDaemonError`]: failures on the local-daemon path. Always absorbed
//!   into degraded reply text by the adapter; never propagated.

use thiserror::Error;

/// Hard failure signalled by the hosted provider adapter.
///
/// The `Display` output is the detail shown to the client in the failover
/// notice.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// No credential configured. Detected before any network call.
    #[error("Missing OpenAI API key")]
    Unconfigured,

    /// Rate limiting or authentication rejection.
    #[error("OpenAI unavailable: {0}")]
    Unavailable(String),

    /// Any other provider-side failure, including transport errors and
    /// replies without message content.
    #[error("OpenAI API error: {0}")]
    Provider(String),
}

impl CompletionError {
    /// Short classification string for logging/metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Unavailable(_) => "unavailable",
            Self::Provider(_) => "provider_error",
        }
    }
}

/// Failure on the local-daemon path.
#[derive(Debug, Error)]
pub enum LocalDaemonError {
    /// Connection, timeout, or other transport failure.
    #[error("{0}")]
    Network(String),

    /// The daemon answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The reply was not valid JSON.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl LocalDaemonError {
    /// Short classification string for logging/metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }

    /// Degraded reply text returned to the client in place of a completion.
    pub fn degraded_reply(&self) -> String {
        format!("❌ Ollama error: {self}")
    }
}
