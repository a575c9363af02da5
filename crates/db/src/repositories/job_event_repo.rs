//! Repository for the append-only `job_events` table.
//!
//! Only `INSERT` and `SELECT` statements live here. Nothing in the
//! application updates or deletes an event.

use jobtrace_core::event::{JobEvent, NewJobEvent, STEP_STATUS_UPDATE};
use jobtrace_core::status::JobStatus;
use jobtrace_core::types::TimestampMs;
use sqlx::SqlitePool;

use crate::models::job_event::JobEventRow;

/// Column list for `job_events` queries.
const COLUMNS: &str =
    "id, job_id, timestamp, step, status, message, file_path, stack_trace, metadata";

/// Maximum number of job ids returned by a recent-jobs listing.
pub const MAX_RECENT_LIMIT: i64 = 500;

/// Provides append and read operations for job events.
pub struct JobEventRepo;

impl JobEventRepo {
    /// Append one event, returning its insertion sequence.
    pub async fn insert(pool: &SqlitePool, event: &NewJobEvent) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO job_events \
                (job_id, timestamp, step, status, message, file_path, stack_trace, metadata) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.job_id)
        .bind(event.timestamp)
        .bind(event.step.as_str())
        .bind(event.status.as_str())
        .bind(event.data.message.as_deref())
        .bind(event.data.file_path.as_deref())
        .bind(event.data.stack_trace.as_deref())
        .bind(event.metadata_json())
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// All events of one job, ordered by `(timestamp, insertion order)`.
    pub async fn list_for_job(
        pool: &SqlitePool,
        job_id: &str,
    ) -> Result<Vec<JobEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_events WHERE job_id = ? ORDER BY timestamp ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, JobEventRow>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(JobEventRow::into_event).collect())
    }

    /// Job ids ordered by their most recent event, newest first.
    ///
    /// `limit` is clamped to `1..=MAX_RECENT_LIMIT`.
    pub async fn recent_job_ids(pool: &SqlitePool, limit: i64) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT job_id FROM job_events \
             GROUP BY job_id \
             ORDER BY MAX(timestamp) DESC, MAX(id) DESC \
             LIMIT ?",
        )
        .bind(limit.clamp(1, MAX_RECENT_LIMIT))
        .fetch_all(pool)
        .await
    }

    /// Jobs whose latest `status_update` is `running` and was written at or
    /// before `cutoff`, oldest first.
    ///
    /// This is a candidate list only; callers re-read each job before
    /// acting on it.
    pub async fn stuck_candidates(
        pool: &SqlitePool,
        cutoff: TimestampMs,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT e.job_id FROM job_events e \
             WHERE e.step = ?1 \
               AND e.id = ( \
                   SELECT l.id FROM job_events l \
                   WHERE l.job_id = e.job_id AND l.step = ?1 \
                   ORDER BY l.timestamp DESC, l.id DESC \
                   LIMIT 1 \
               ) \
               AND e.status = ?2 \
               AND e.timestamp <= ?3 \
             ORDER BY e.timestamp ASC",
        )
        .bind(STEP_STATUS_UPDATE)
        .bind(JobStatus::Running.as_str())
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Number of events stored for one job.
    pub async fn count_for_job(pool: &SqlitePool, job_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM job_events WHERE job_id = ?")
            .bind(job_id)
            .fetch_one(pool)
            .await
    }
}
