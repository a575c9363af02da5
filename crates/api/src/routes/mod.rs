pub mod health;
pub mod jobs;
pub mod mirror;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                  WebSocket (live dashboard feed)
///
/// /jobs                                recent job snapshots (?limit)
/// /jobs/{id}                           one job snapshot
///
/// /mirror/operations                   cached snapshots (GET), push (POST)
/// /mirror/system-metrics               push system metrics
/// /mirror/alerts                       push alert
/// /mirror/user-metrics                 push user metrics
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/jobs", jobs::router())
        .nest("/mirror", mirror::router())
}
