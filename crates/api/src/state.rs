use std::sync::Arc;

use jobtrace_tracker::IdentityResolver;

use crate::config::ServerConfig;
use crate::mirror::Mirror;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Event log the producer appends to; read-only here.
    pub pool: jobtrace_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Live dashboard subscribers.
    pub ws_manager: Arc<WsManager>,
    /// Bounded cache of pushed job snapshots plus metrics and alerts.
    pub mirror: Arc<Mirror>,
    /// Cached username lookups against the user registry.
    pub identity: IdentityResolver,
}
