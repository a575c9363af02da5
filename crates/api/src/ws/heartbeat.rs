use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// Shortest allowed gap between two liveness probes.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn the liveness loop for dashboard subscribers.
///
/// Each tick evicts clients that ignored the previous Ping and pings the
/// rest. `every` is raised to [`MIN_HEARTBEAT_INTERVAL`] if shorter. The
/// task runs until aborted at shutdown.
pub fn start_heartbeat(ws_manager: Arc<WsManager>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(MIN_HEARTBEAT_INTERVAL));

        loop {
            interval.tick().await;
            let evicted = ws_manager.probe_and_evict().await;
            let count = ws_manager.connection_count().await;
            tracing::debug!(count, evicted, "WebSocket heartbeat ping");
        }
    })
}
