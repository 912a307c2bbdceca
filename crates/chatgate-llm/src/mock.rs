//! Deterministic backend for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chatgate_core::{CompletionError, ProviderSelection};
use parking_lot::Mutex;

use crate::backend::CompletionBackend;

/// What a [`ScriptedBackend`] does once its script is exhausted.
#[derive(Clone, Debug)]
enum Fallback {
    Reply(String),
    Fail(CompletionError),
    Echo,
}

/// A backend that replays scripted outcomes and records every prompt.
#[derive(Debug)]
pub struct ScriptedBackend {
    selection: ProviderSelection,
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    fallback: Fallback,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    fn with_fallback(selection: ProviderSelection, fallback: Fallback) -> Self {
        Self {
            selection,
            script: Mutex::new(VecDeque::new()),
            fallback,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Always replies with `text`.
    pub fn replying(selection: ProviderSelection, text: impl Into<String>) -> Self {
        Self::with_fallback(selection, Fallback::Reply(text.into()))
    }

    /// Always fails with `error`.
    pub fn failing(selection: ProviderSelection, error: CompletionError) -> Self {
        Self::with_fallback(selection, Fallback::Fail(error))
    }

    /// Replies `"{model}: {prompt}"`, where the model is the provider name.
    pub fn echo(selection: ProviderSelection) -> Self {
        Self::with_fallback(selection, Fallback::Echo)
    }

    /// Queue outcomes consumed before the fallback behavior applies.
    #[must_use]
    pub fn then(self, outcomes: impl IntoIterator<Item = Result<String, CompletionError>>) -> Self {
        self.script.lock().extend(outcomes);
        self
    }

    /// Sleep for `delay` before every outcome, like a slow model.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn selection(&self) -> ProviderSelection {
        self.selection
    }

    fn model(&self) -> &str {
        self.selection.name()
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(outcome) = self.script.lock().pop_front() {
            return outcome;
        }
        match &self.fallback {
            Fallback::Reply(text) => Ok(text.clone()),
            Fallback::Fail(err) => Err(err.clone()),
            Fallback::Echo => Ok(format!("{}: {prompt}", self.selection.name())),
        }
    }
}
