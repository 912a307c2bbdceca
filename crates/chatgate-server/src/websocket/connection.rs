//! Transport handle for one connected session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chatgate_core::Outbound;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A connected `WebSocket` client, owned by its registry entry.
///
/// Outbound text goes through a bounded queue drained by the socket writer
/// task. `close` asks both the writer and the reader loop to stop.
pub struct ClientConnection {
    /// Session identifier from the upgrade path.
    pub session_id: String,
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    is_alive: AtomicBool,
    last_activity: Mutex<Instant>,
    dropped_messages: AtomicU64,
    close: CancellationToken,
}

impl ClientConnection {
    /// Create a connection that writes into `tx`.
    pub fn new(session_id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            session_id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_activity: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
            close: CancellationToken::new(),
        }
    }

    /// Enqueue a text frame.
    ///
    /// Returns `false` if the connection is closing or the queue is full or
    /// closed, and counts the drop.
    pub fn send(&self, message: Arc<String>) -> bool {
        if !self.close.is_cancelled() && self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Render and enqueue a protocol frame.
    pub fn send_outbound(&self, message: &Outbound) -> bool {
        self.send(Arc::new(message.to_string()))
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record inbound activity (any frame, including Pong).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last inbound activity (or establishment).
    pub fn last_activity_elapsed(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Check and reset the alive flag for heartbeat.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Signal the reader and writer to stop. Idempotent.
    pub fn close(&self) {
        self.close.cancel();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled()
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        self.close.cancelled().await;
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("session_id", &self.session_id)
            .field("closed", &self.is_closed())
            .field("dropped_messages", &self.drop_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chatgate_core::ProviderSelection;

    use super::*;

    fn make_connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClientConnection::new("c1".into(), tx), rx)
    }

    #[tokio::test]
    async fn send_outbound_renders_text() {
        let (conn, mut rx) = make_connection(8);
        assert!(conn.send_outbound(&Outbound::Connected(ProviderSelection::PrimaryHosted)));
        assert_eq!(&*rx.recv().await.unwrap(), "✅ Connected. Current provider: OPENAI");
    }

    #[test]
    fn full_queue_counts_drop() {
        let (conn, _rx) = make_connection(1);
        assert!(conn.send(Arc::new("a".into())));
        assert!(!conn.send(Arc::new("b".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn closed_receiver_counts_drop() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert!(!conn.send(Arc::new("a".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn send_after_close_is_rejected() {
        let (conn, _rx) = make_connection(4);
        conn.close();
        conn.close();
        assert!(conn.is_closed());
        assert!(!conn.send(Arc::new("late".into())));
    }

    #[tokio::test]
    async fn closed_resolves_after_close() {
        let (conn, _rx) = make_connection(4);
        let conn = Arc::new(conn);
        let waiter = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.closed().await })
        };
        conn.close();
        waiter.await.unwrap();
    }

    #[test]
    fn alive_flag_resets_on_check() {
        let (conn, _rx) = make_connection(4);
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
        assert!(conn.last_activity_elapsed() < Duration::from_secs(1));
    }
}
