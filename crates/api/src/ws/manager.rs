use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// State kept for one dashboard subscriber.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: DateTime<Utc>,
    /// A Ping went out and no Pong has come back yet.
    pub awaiting_pong: bool,
    /// Cancelled when the manager drops this connection.
    pub closed: CancellationToken,
}

/// Manages all live dashboard subscribers.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` and shared across
/// the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink, and the token that fires
    /// once the manager evicts or shuts down the connection.
    pub async fn add(
        &self,
        conn_id: String,
    ) -> (mpsc::UnboundedReceiver<Message>, CancellationToken) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();
        let conn = WsConnection {
            sender: tx,
            connected_at: Utc::now(),
            awaiting_pong: false,
            closed: closed.clone(),
        };
        self.connections.write().await.insert(conn_id, conn);
        (rx, closed)
    }

    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Queue a message for one connection. Returns `false` if the
    /// connection is gone.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        let conns = self.connections.read().await;
        conns
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(message).is_ok())
    }

    /// Broadcast a message to all connected clients.
    ///
    /// Connections whose send channels are closed are skipped; they are
    /// removed by their own receive loop or by the next liveness probe.
    pub async fn broadcast(&self, message: Message) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(message.clone());
        }
    }

    /// Record a Pong from `conn_id`.
    pub async fn mark_alive(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.awaiting_pong = false;
        }
    }

    /// One liveness cycle.
    ///
    /// Connections still awaiting the Pong for the previous Ping are sent a
    /// Close frame and dropped. Every survivor is marked as awaiting and
    /// pinged. Returns the number of evicted connections.
    pub async fn probe_and_evict(&self) -> usize {
        let mut conns = self.connections.write().await;

        let stale: Vec<String> = conns
            .iter()
            .filter(|(_, conn)| conn.awaiting_pong)
            .map(|(id, _)| id.clone())
            .collect();
        for conn_id in &stale {
            if let Some(conn) = conns.remove(conn_id) {
                let _ = conn.sender.send(Message::Close(None));
                conn.closed.cancel();
                tracing::info!(conn_id = %conn_id, "Evicting unresponsive WebSocket client");
            }
        }

        for conn in conns.values_mut() {
            conn.awaiting_pong = true;
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }

        stale.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, cancel its token, then clear
    /// the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
            conn.closed.cancel();
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
