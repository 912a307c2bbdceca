//! Per-connection chat protocol.
//!
//! ```text
//! Connected ──announce──▶ Active ──close──▶ Closed
//!                          │  ▲
//!                          └──┘ /use <provider>, prompt, failover
//! ```
//!
//! Inside `Active`, each inbound text frame is either a `/use` command that
//! changes this session's provider, or a prompt dispatched to the backend
//! for the current provider. A hard failure from the hosted backend moves the
//! session to the local fallback until the next `/use`, notifies the client,
//! and retries the same prompt locally. Replies go to the originating
//! connection only.

use std::sync::Arc;
use std::time::Instant;

use chatgate_core::{CompletionError, Inbound, Outbound, ProviderSelection};
use chatgate_llm::{BackendSet, ProviderHealthTracker};
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::metrics::{
    PROVIDER_ERRORS_TOTAL, PROVIDER_FAILOVERS_TOTAL, PROVIDER_REQUEST_DURATION_SECONDS,
    PROVIDER_REQUESTS_TOTAL,
};
use crate::websocket::connection::ClientConnection;

/// Lifecycle of one chat session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake complete, announcement not yet sent.
    Connected,
    /// Announcement sent; processing inbound text.
    Active,
    /// Transport gone. Terminal.
    Closed,
}

/// Protocol state for a single connection.
///
/// Owned by the connection's receive loop; never shared, so the provider
/// selection needs no synchronization.
pub struct ChatSession {
    session_id: String,
    selection: ProviderSelection,
    state: SessionState,
    backends: BackendSet,
    health: Arc<ProviderHealthTracker>,
}

impl ChatSession {
    /// New session starting on `default_provider`.
    pub fn new(
        session_id: impl Into<String>,
        default_provider: ProviderSelection,
        backends: BackendSet,
        health: Arc<ProviderHealthTracker>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            selection: default_provider,
            state: SessionState::Connected,
            backends,
            health,
        }
    }

    /// Session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Provider the next prompt will be dispatched to.
    pub fn selection(&self) -> ProviderSelection {
        self.selection
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Send the connection announcement and enter `Active`.
    pub fn announce(&mut self, conn: &ClientConnection) {
        if self.state != SessionState::Connected {
            return;
        }
        notify(conn, &Outbound::Connected(self.selection));
        self.state = SessionState::Active;
    }

    /// Process one inbound text frame to completion.
    ///
    /// Frames arriving in `Connected` or `Closed` are ignored.
    pub async fn handle_text(&mut self, text: &str, conn: &ClientConnection) {
        if self.state != SessionState::Active {
            debug!(state = ?self.state, "ignoring text outside active state");
            return;
        }

        match Inbound::parse(text) {
            Inbound::SwitchProvider(provider) => {
                self.selection = provider;
                info!(provider = provider.name(), "provider switched");
                notify(conn, &Outbound::Switched(provider));
            }
            Inbound::InvalidProvider(name) => {
                debug!(requested = %name, "rejected provider switch");
                notify(conn, &Outbound::InvalidProvider);
            }
            Inbound::Prompt(prompt) => {
                info!(provider = self.selection.name(), prompt_len = prompt.len(), "received message");
                let reply = self.respond(prompt, conn).await;
                notify(conn, &Outbound::Assistant(reply));
            }
        }
    }

    /// Enter `Closed`.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    async fn respond(&mut self, prompt: &str, conn: &ClientConnection) -> String {
        match self.dispatch(self.selection, prompt).await {
            Ok(text) => text,
            Err(err) if self.selection.can_fail_over() => {
                self.fail_over(&err, conn);
                match self.dispatch(self.selection, prompt).await {
                    Ok(text) => text,
                    Err(err) => err.to_string(),
                }
            }
            Err(err) => err.to_string(),
        }
    }

    /// Sticky switch to the local fallback after a hosted failure.
    fn fail_over(&mut self, err: &CompletionError, conn: &ClientConnection) {
        self.selection = ProviderSelection::LocalFallback;
        counter!(PROVIDER_FAILOVERS_TOTAL).increment(1);
        warn!(error_kind = err.kind(), error = %err, "hosted provider failed, switching to local fallback");
        notify(
            conn,
            &Outbound::FailedOver {
                detail: err.to_string(),
            },
        );
    }

    async fn dispatch(
        &self,
        provider: ProviderSelection,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let backend = self.backends.for_selection(provider);
        counter!(PROVIDER_REQUESTS_TOTAL, "provider" => provider.name()).increment(1);
        let started = Instant::now();

        let result = backend.complete(prompt).await;

        histogram!(PROVIDER_REQUEST_DURATION_SECONDS, "provider" => provider.name())
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => self.health.record_success(provider),
            Err(err) => {
                self.health.record_failure(provider);
                counter!(PROVIDER_ERRORS_TOTAL, "provider" => provider.name(), "kind" => err.kind())
                    .increment(1);
                warn!(provider = provider.name(), model = backend.model(), error_kind = err.kind(), "completion failed");
            }
        }
        result
    }
}

/// Queue `message`, logging when the connection cannot take it.
fn notify(conn: &ClientConnection, message: &Outbound) {
    if !conn.send_outbound(message) {
        warn!(
            session_id = %conn.session_id,
            dropped = conn.drop_count(),
            "failed to enqueue outbound message (queue full or closed)"
        );
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("session_id", &self.session_id)
            .field("selection", &self.selection)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
