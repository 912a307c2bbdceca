//! Live transports keyed by session identifier.
//!
//! At most one handle per identifier: `connect` overwrites (last connect
//! wins) and hands back the displaced handle so the caller can close it.
//! Every operation is safe to call concurrently; `DashMap` shards its own
//! locking and no shard lock is held across a send.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// Delivery outcome of a [`ConnectionRegistry::broadcast`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Handles that accepted the frame.
    pub delivered: usize,
    /// Handles whose queue was full or closed.
    pub failed: usize,
}

/// Process-wide session → transport table.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: DashMap<String, Arc<ClientConnection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under `session_id`, returning the handle it displaced.
    ///
    /// The entry is visible to `send_to` and `broadcast` as soon as this
    /// returns.
    pub fn connect(
        &self,
        session_id: impl Into<String>,
        handle: Arc<ClientConnection>,
    ) -> Option<Arc<ClientConnection>> {
        let session_id = session_id.into();
        let displaced = self.entries.insert(session_id.clone(), handle);
        debug!(session_id, replaced = displaced.is_some(), "session registered");
        displaced
    }

    /// Remove the entry for `session_id` if present. No-op otherwise.
    pub fn disconnect(&self, session_id: &str) -> Option<Arc<ClientConnection>> {
        self.entries.remove(session_id).map(|(_, handle)| handle)
    }

    /// Remove the entry only if it is still `handle`.
    ///
    /// A session whose entry has been taken over by a newer connection leaves
    /// the newer entry in place.
    pub fn release(&self, session_id: &str, handle: &Arc<ClientConnection>) -> bool {
        self.entries
            .remove_if(session_id, |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }

    /// Deliver `message` to one session. Returns `false` when the session is
    /// absent or its queue rejected the frame.
    pub fn send_to(&self, session_id: &str, message: impl Into<String>) -> bool {
        let Some(handle) = self.get(session_id) else {
            return false;
        };
        handle.send(Arc::new(message.into()))
    }

    /// Deliver `message` to every handle registered at call time.
    ///
    /// A failed handle is counted and skipped; the rest still receive the
    /// frame.
    pub fn broadcast(&self, message: impl Into<String>) -> BroadcastReport {
        let message = Arc::new(message.into());
        let snapshot: Vec<Arc<ClientConnection>> =
            self.entries.iter().map(|e| e.value().clone()).collect();

        let mut report = BroadcastReport::default();
        for handle in snapshot {
            if handle.send(message.clone()) {
                report.delivered += 1;
            } else {
                report.failed += 1;
                counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                warn!(session_id = %handle.session_id, "failed to broadcast to client");
            }
        }
        debug!(delivered = report.delivered, failed = report.failed, "broadcast complete");
        report
    }

    /// Current handle for `session_id`.
    pub fn get(&self, session_id: &str) -> Option<Arc<ClientConnection>> {
        self.entries.get(session_id).map(|e| e.value().clone())
    }

    /// Whether `session_id` is registered.
    pub fn contains(&self, session_id: &str) -> bool {
        self.entries.contains_key(session_id)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered session identifiers, unordered.
    pub fn session_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn handle(id: &str, capacity: usize) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(ClientConnection::new(id.into(), tx)), rx)
    }

    #[tokio::test]
    async fn send_to_reaches_only_target() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = handle("A", 8);
        let (b, mut rx_b) = handle("B", 8);
        assert!(registry.connect("A", a).is_none());
        assert!(registry.connect("B", b).is_none());

        assert!(registry.send_to("A", "for A"));
        assert_eq!(&*rx_a.recv().await.unwrap(), "for A");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn send_to_absent_is_silent() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to("ghost", "hello"));
    }

    #[tokio::test]
    async fn connect_same_id_replaces() {
        let registry = ConnectionRegistry::new();
        let (old, mut rx_old) = handle("c1", 8);
        let (new, mut rx_new) = handle("c1", 8);
        assert!(registry.connect("c1", old.clone()).is_none());

        let displaced = registry.connect("c1", new).unwrap();
        assert!(Arc::ptr_eq(&displaced, &old));
        assert_eq!(registry.len(), 1);

        let report = registry.broadcast("ping");
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 0 });
        assert_eq!(&*rx_new.recv().await.unwrap(), "ping");
        assert!(rx_old.try_recv().is_err());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (a, _rx) = handle("A", 8);
        let _ = registry.connect("A", a);
        assert!(registry.disconnect("A").is_some());
        assert!(registry.disconnect("A").is_none());
        assert!(registry.disconnect("never").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn release_keeps_newer_entry() {
        let registry = ConnectionRegistry::new();
        let (old, _rx_old) = handle("c1", 8);
        let (new, _rx_new) = handle("c1", 8);
        let _ = registry.connect("c1", old.clone());
        let _ = registry.connect("c1", new.clone());

        assert!(!registry.release("c1", &old));
        assert!(registry.contains("c1"));
        assert!(registry.release("c1", &new));
        assert!(!registry.contains("c1"));
    }

    #[tokio::test]
    async fn broadcast_survives_failed_handle() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = handle("A", 8);
        let (b, rx_b) = handle("B", 8);
        let (c, mut rx_c) = handle("C", 8);
        drop(rx_b);
        let _ = registry.connect("A", a);
        let _ = registry.connect("B", b);
        let _ = registry.connect("C", c);

        let report = registry.broadcast("hello all");
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 1 });
        assert_eq!(&*rx_a.recv().await.unwrap(), "hello all");
        assert_eq!(&*rx_c.recv().await.unwrap(), "hello all");
    }

    #[test]
    fn broadcast_skips_disconnected() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = handle("A", 8);
        let (b, _rx_b) = handle("B", 8);
        let _ = registry.connect("A", a);
        let _ = registry.connect("B", b.clone());
        let _ = registry.disconnect("B");

        let report = registry.broadcast("x");
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 0 });
        assert_eq!(b.drop_count(), 0);
    }

    #[test]
    fn broadcast_empty_registry() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.broadcast("x"), BroadcastReport::default());
    }

    #[test]
    fn session_ids_lists_all() {
        let registry = ConnectionRegistry::new();
        for id in ["A", "B", "C"] {
            let (h, _rx) = handle(id, 1);
            let _ = registry.connect(id, h);
        }
        let mut ids = registry.session_ids();
        ids.sort();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn concurrent_connects_are_safe() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let id = format!("s{i}");
                let (h, _rx) = handle(&id, 1);
                let _ = registry.connect(id.clone(), h);
                let _ = registry.broadcast("tick");
                registry.disconnect(&id).is_some()
            }));
        }
        for t in tasks {
            assert!(t.await.unwrap());
        }
        assert!(registry.is_empty());
    }
}
