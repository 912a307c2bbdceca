//! Provider selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which completion backend a session dispatches prompts to.
///
/// Scoped to a single session. Only that session's own `/use` command or its
/// own failover may change it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderSelection {
    /// The hosted API provider (`openai`).
    #[default]
    #[serde(rename = "openai")]
    PrimaryHosted,
    /// The local daemon provider (`ollama`). Terminal fallback.
    #[serde(rename = "ollama")]
    LocalFallback,
}

impl ProviderSelection {
    /// Every selectable provider, in announcement order.
    pub const ALL: [Self; 2] = [Self::PrimaryHosted, Self::LocalFallback];

    /// Lowercase wire name used by `/use` and configuration.
    pub fn name(self) -> &'static str {
        match self {
            Self::PrimaryHosted => "openai",
            Self::LocalFallback => "ollama",
        }
    }

    /// Uppercase label used in client-facing notices.
    pub fn label(self) -> &'static str {
        match self {
            Self::PrimaryHosted => "OPENAI",
            Self::LocalFallback => "OLLAMA",
        }
    }

    /// Whether a hard failure on this provider may trigger failover.
    pub fn can_fail_over(self) -> bool {
        matches!(self, Self::PrimaryHosted)
    }
}

impl fmt::Display for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a provider name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0:?}")]
pub struct ParseProviderError(pub String);

impl FromStr for ProviderSelection {
    type Err = ParseProviderError;

    /// Case-insensitive after trimming surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or(ParseProviderError(normalized))
    }
}
