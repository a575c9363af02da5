//! Handlers for the `/mirror` push endpoints.
//!
//! Pushes always answer HTTP 200; a refused snapshot is reported in the
//! body as `{accepted: false, reason}`.

use axum::extract::State;
use axum::Json;
use jobtrace_core::mirror::PushResponse;
use jobtrace_core::snapshot::JobSnapshot;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

fn require_object(payload: Value, what: &str) -> AppResult<Value> {
    if payload.is_object() {
        Ok(payload)
    } else {
        Err(AppError::BadRequest(format!("{what} must be a JSON object")))
    }
}

/// GET /api/v1/mirror/operations
pub async fn list_operations(
    State(state): State<AppState>,
) -> Json<DataResponse<Vec<JobSnapshot>>> {
    Json(DataResponse {
        data: state.mirror.operations().await,
    })
}

/// POST /api/v1/mirror/operations
pub async fn push_operation(
    State(state): State<AppState>,
    Json(snapshot): Json<JobSnapshot>,
) -> Json<PushResponse> {
    Json(state.mirror.push_operation(snapshot).await)
}

/// POST /api/v1/mirror/system-metrics
pub async fn push_system_metrics(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<Json<PushResponse>> {
    let metrics = require_object(payload, "System metrics")?;
    state.mirror.push_system_metrics(metrics).await;
    Ok(Json(PushResponse::accepted()))
}

/// POST /api/v1/mirror/alerts
pub async fn push_alert(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<Json<PushResponse>> {
    let alert = require_object(payload, "Alert")?;
    state.mirror.push_alert(alert).await;
    Ok(Json(PushResponse::accepted()))
}

/// POST /api/v1/mirror/user-metrics
pub async fn push_user_metrics(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<Json<PushResponse>> {
    let metrics = require_object(payload, "User metrics")?;
    state.mirror.push_user_metrics(metrics).await;
    Ok(Json(PushResponse::accepted()))
}
