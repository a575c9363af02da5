//! Route definitions for the `/mirror` push endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::mirror;
use crate::state::AppState;

/// Routes mounted at `/mirror`.
///
/// ```text
/// GET    /operations      -> list_operations
/// POST   /operations      -> push_operation
/// POST   /system-metrics  -> push_system_metrics
/// POST   /alerts          -> push_alert
/// POST   /user-metrics    -> push_user_metrics
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/operations",
            get(mirror::list_operations).post(mirror::push_operation),
        )
        .route("/system-metrics", post(mirror::push_system_metrics))
        .route("/alerts", post(mirror::push_alert))
        .route("/user-metrics", post(mirror::push_user_metrics))
}
