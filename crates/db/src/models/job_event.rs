//! Row model for the `job_events` table.

use jobtrace_core::event::{JobEvent, Step};
use jobtrace_core::status::JobStatus;
use sqlx::FromRow;

/// A row from the `job_events` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobEventRow {
    pub id: i64,
    pub job_id: String,
    pub timestamp: i64,
    pub step: String,
    pub status: String,
    pub message: Option<String>,
    pub file_path: Option<String>,
    pub stack_trace: Option<String>,
    pub metadata: Option<String>,
}

impl JobEventRow {
    /// Convert to the domain event.
    ///
    /// The table constrains `status`, but a row written by an older
    /// producer may still carry something else; it degrades to `pending`.
    pub fn into_event(self) -> JobEvent {
        let status = self.status.parse::<JobStatus>().unwrap_or_else(|e| {
            tracing::warn!(
                job_id = %self.job_id,
                seq = self.id,
                error = %e,
                "Unreadable event status, treating as pending",
            );
            JobStatus::Pending
        });

        JobEvent {
            seq: self.id,
            step: Step::from(self.step),
            job_id: self.job_id,
            timestamp: self.timestamp,
            status,
            message: self.message,
            file_path: self.file_path,
            stack_trace: self.stack_trace,
            metadata: self.metadata,
        }
    }
}
