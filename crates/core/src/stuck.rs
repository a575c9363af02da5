//! Stuck-job predicate and the remediation event.

use crate::event::{EventData, JobEvent, NewJobEvent, Step};
use crate::metadata::Metadata;
use crate::status::JobStatus;
use crate::types::{JobId, TimestampMs};

/// Default age after which a running job is presumed abandoned.
pub const DEFAULT_THRESHOLD_MINUTES: i64 = 10;

/// Message of the remediation status update.
pub const TIMEOUT_MESSAGE: &str = "timed out";

/// `metadata.reason` of the remediation status update.
pub const TIMEOUT_REASON: &str = "timeout";

/// Newest `status_update` timestamp that already counts as stale.
///
/// Saturates, so an absurd threshold yields a cutoff no event can reach.
pub fn cutoff_ms(now: TimestampMs, threshold_minutes: i64) -> TimestampMs {
    now.saturating_sub(threshold_minutes.max(0).saturating_mul(60_000))
}

/// Latest `status_update` event in `(timestamp, seq)` order.
pub fn latest_status_update(events: &[JobEvent]) -> Option<&JobEvent> {
    events
        .iter()
        .filter(|e| e.step == Step::StatusUpdate)
        .max_by_key(|e| (e.timestamp, e.seq))
}

/// A job is stuck when its latest status update says `running` and was
/// written at or before `cutoff`.
pub fn is_stuck(events: &[JobEvent], cutoff: TimestampMs) -> bool {
    latest_status_update(events)
        .is_some_and(|e| e.status == JobStatus::Running && e.timestamp <= cutoff)
}

/// The event that marks a stuck job as failed.
pub fn remediation_event(job_id: impl Into<JobId>, now: TimestampMs) -> NewJobEvent {
    let metadata = Metadata::new()
        .with("previousStatus", JobStatus::Running.as_str())
        .with("newStatus", JobStatus::Error.as_str())
        .with("reason", TIMEOUT_REASON)
        .with("autoMarked", true);

    NewJobEvent::new(
        job_id,
        now,
        Step::StatusUpdate,
        JobStatus::Error,
        EventData::new()
            .with_message(TIMEOUT_MESSAGE)
            .with_metadata(metadata),
    )
}
