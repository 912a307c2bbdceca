//! `WebSocket` transport: per-connection handle, registry, and session loop.

pub mod connection;
pub mod registry;
pub mod session;
