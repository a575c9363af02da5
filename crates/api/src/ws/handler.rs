use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::mirror::Mirror;
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// How long an evicted connection gets to flush its Close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// GET /api/v1/ws -- upgrade to a live dashboard subscription.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, state.mirror))
}

/// Manage a single subscriber after upgrade.
///
/// The connection is registered with the mirror's current state queued
/// for it, and then two tasks run until either finishes: the sender
/// forwards the manager channel to the socket, the receiver records Pongs.
/// When the manager evicts or shuts down the connection, the sender gets
/// [`CLOSE_GRACE`] to deliver the Close frame before both tasks are
/// aborted and the socket dropped.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, mirror: Arc<Mirror>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (mut rx, closed) = mirror.subscribe(&conn_id).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let receiver_conn_id = conn_id.clone();
    let receiver_manager = Arc::clone(&ws_manager);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(Message::Pong(_)) => {
                    tracing::trace!(conn_id = %receiver_conn_id, "Pong received");
                    receiver_manager.mark_alive(&receiver_conn_id).await;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(conn_id = %receiver_conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
        () = closed.cancelled() => {
            if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
                tracing::debug!(conn_id = %conn_id, "Close frame not flushed, dropping socket");
                send_task.abort();
            }
            recv_task.abort();
        }
    }

    ws_manager.remove(&conn_id).await;
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
