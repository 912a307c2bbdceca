//! # chatgate-llm
//!
//! Completion backends for the chat gateway.
//!
//! - [`CompletionBackend`]: one-shot prompt → reply abstraction
//! - [`OpenAiBackend`]: hosted chat-completions API (primary)
//! - [`OllamaBackend`]: local Ollama daemon (fallback, never fails hard)
//! - [`BackendSet`]: the pair the gateway dispatches between
//! - [`ProviderHealthTracker`]: rolling error-rate gauge per provider
//! - [`mock::ScriptedBackend`]: deterministic backend for tests

#![deny(unsafe_code)]

pub mod backend;
pub mod error_parsing;
pub mod health;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use backend::{BackendSet, CompletionBackend};
pub use health::ProviderHealthTracker;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
