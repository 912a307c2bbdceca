//! # chatgate-server
//!
//! Axum HTTP + `WebSocket` gateway.
//!
//! - `GET /ws/{session_id}`: one chat session per connection
//! - [`websocket::registry::ConnectionRegistry`]: live transports keyed by session id
//! - [`session::ChatSession`]: per-connection protocol state machine with sticky failover
//! - `GET /api/health` and `GET /metrics` (Prometheus)
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod websocket;
