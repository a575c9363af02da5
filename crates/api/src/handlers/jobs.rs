//! Handlers for the `/jobs` resource.
//!
//! Snapshots are rebuilt from the event log on every request, so these
//! endpoints see jobs the mirror cache never received or already evicted.

use axum::extract::{Path, Query, State};
use axum::Json;
use jobtrace_core::error::CoreError;
use jobtrace_core::reconstruct::reconstruct;
use jobtrace_core::snapshot::JobSnapshot;
use jobtrace_db::repositories::JobEventRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Default number of jobs returned by `GET /jobs`.
const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct RecentJobsQuery {
    /// Maximum number of results. Defaults to 50, capped at 500.
    pub limit: Option<i64>,
}

async fn load_snapshot(state: &AppState, job_id: &str) -> AppResult<Option<JobSnapshot>> {
    let events = JobEventRepo::list_for_job(&state.pool, job_id).await?;
    let Some(mut snapshot) = reconstruct(&events) else {
        return Ok(None);
    };
    state.identity.enrich(&mut snapshot).await;
    Ok(Some(snapshot))
}

/// GET /api/v1/jobs?limit=N
///
/// Most recently active jobs, newest first. Jobs without a `created` event
/// are skipped.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<RecentJobsQuery>,
) -> AppResult<Json<DataResponse<Vec<JobSnapshot>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let ids = JobEventRepo::recent_job_ids(&state.pool, limit).await?;

    let mut snapshots = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(snapshot) = load_snapshot(&state, &id).await? {
            snapshots.push(snapshot);
        }
    }

    Ok(Json(DataResponse { data: snapshots }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<DataResponse<JobSnapshot>>> {
    let snapshot = load_snapshot(&state, &job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    Ok(Json(DataResponse { data: snapshot }))
}
