//! `WebSocket` session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_REPLACED_TOTAL,
    WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
};
use crate::server::AppState;
use crate::session::ChatSession;

/// Run a chat session for a connected client.
///
/// 1. Registers the transport under `session_id`, closing any connection it
///    displaces
/// 2. Announces the default provider
/// 3. Reads frames on a separate task, so heartbeats are answered while a
///    completion runs, and feeds text to the [`ChatSession`] one at a time
/// 4. Forwards queued outbound frames and sends periodic Pings
/// 5. Releases the registry entry on disconnect, displacement, or shutdown
#[instrument(skip_all, fields(session_id = %session_id))]
pub async fn run_ws_session(ws: WebSocket, session_id: String, state: AppState) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(state.config.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(session_id.clone(), send_tx));

    if let Some(displaced) = state.registry.connect(session_id.clone(), connection.clone()) {
        info!("session id reconnected, closing previous connection");
        counter!(WS_CONNECTIONS_REPLACED_TOTAL).increment(1);
        displaced.close();
    }
    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let mut chat = ChatSession::new(
        session_id.clone(),
        state.default_provider,
        state.backends.clone(),
        state.health.clone(),
    );
    chat.announce(&connection);

    // Outbound forwarder with periodic Ping frames.
    let outbound_conn = connection.clone();
    let shutdown = state.shutdown.clone();
    let heartbeat_interval = state.config.heartbeat_interval;
    let heartbeat_timeout = state.config.heartbeat_timeout;
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat_interval);
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text((*text).clone().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_activity_elapsed() > heartbeat_timeout
                    {
                        warn!("client unresponsive for {heartbeat_timeout:?}, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
                () = outbound_conn.closed() => break,
                () = shutdown.cancelled() => break,
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
        outbound_conn.close();
    });

    // Reader: keeps draining the socket while a completion is in flight so
    // Pongs still refresh liveness. Text goes to the session loop in order.
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<String>(state.config.send_queue_capacity);
    let reader_conn = connection.clone();
    let reader = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                msg = ws_rx.next() => msg,
                () = reader_conn.closed() => break,
            };
            let Some(Ok(msg)) = msg else { break };
            reader_conn.mark_alive();

            let text = match msg {
                Message::Text(t) => t.to_string(),
                Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                    Ok(s) => s,
                    Err(_) => {
                        info!(len = data.len(), "received non-UTF8 binary frame");
                        continue;
                    }
                },
                Message::Close(_) => {
                    info!("client sent close frame");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => continue,
            };
            tokio::select! {
                sent = inbound_tx.send(text) => {
                    if sent.is_err() {
                        break;
                    }
                }
                () = reader_conn.closed() => break,
            }
        }
    });

    loop {
        let text = tokio::select! {
            text = inbound_rx.recv() => text,
            () = connection.closed() => {
                debug!("connection closed by server");
                break;
            }
        };
        let Some(text) = text else { break };

        tokio::select! {
            () = chat.handle_text(&text, &connection) => {}
            () = connection.closed() => {
                debug!("connection closed during completion");
                break;
            }
        }
    }

    chat.close();
    connection.close();
    let released = state.registry.release(&session_id, &connection);
    info!(released, dropped = connection.drop_count(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
    let _ = reader.await;
    let _ = outbound.await;
}
