//! Backend trait and the hosted/local pair.

use std::sync::Arc;

use async_trait::async_trait;
use chatgate_core::{CompletionError, ProviderSelection};

/// A one-shot completion backend.
///
/// Implementations are stateless with respect to sessions: each call is a
/// single user prompt with no conversation history.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Which provider this backend serves.
    fn selection(&self) -> ProviderSelection;

    /// Model identifier sent upstream.
    fn model(&self) -> &str;

    /// Produce a reply for `prompt`.
    ///
    /// The local fallback absorbs its own failures into reply text and only
    /// returns `Err` if an implementation chooses to.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// The hosted primary and the local fallback, shared by every session.
#[derive(Clone)]
pub struct BackendSet {
    hosted: Arc<dyn CompletionBackend>,
    local: Arc<dyn CompletionBackend>,
}

impl BackendSet {
    /// Pair a hosted backend with a local one.
    pub fn new(hosted: Arc<dyn CompletionBackend>, local: Arc<dyn CompletionBackend>) -> Self {
        Self { hosted, local }
    }

    /// Backend serving `selection`.
    pub fn for_selection(&self, selection: ProviderSelection) -> &dyn CompletionBackend {
        match selection {
            ProviderSelection::PrimaryHosted => self.hosted.as_ref(),
            ProviderSelection::LocalFallback => self.local.as_ref(),
        }
    }
}

impl std::fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSet")
            .field("hosted", &self.hosted.model())
            .field("local", &self.local.model())
            .finish()
    }
}
