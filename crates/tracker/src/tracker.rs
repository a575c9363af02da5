//! The producer's job tracker.

use std::sync::Arc;

use jobtrace_core::event::{EventData, NewJobEvent, Step};
use jobtrace_core::mirror::PushResponse;
use jobtrace_core::reconstruct::reconstruct;
use jobtrace_core::snapshot::JobSnapshot;
use jobtrace_core::status::JobStatus;
use jobtrace_core::stuck::{cutoff_ms, remediation_event};
use jobtrace_core::types::{now_ms, TimestampMs};
use jobtrace_db::repositories::JobEventRepo;
use jobtrace_db::DbPool;

use crate::identity::IdentityResolver;
use crate::mirror_client::MirrorClient;

/// Appends job events and serves reconstructed snapshots.
///
/// Tracking must never break a job: write and read failures are logged and
/// turned into `None` / empty results.
#[derive(Clone)]
pub struct JobTracker {
    pool: DbPool,
    identity: IdentityResolver,
    mirror: Option<Arc<MirrorClient>>,
}

impl JobTracker {
    pub fn new(pool: DbPool, identity: IdentityResolver) -> Self {
        Self {
            pool,
            identity,
            mirror: None,
        }
    }

    /// Relay a fresh snapshot to the observer after every append.
    pub fn with_mirror(mut self, client: MirrorClient) -> Self {
        self.mirror = Some(Arc::new(client));
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    /// Append an event stamped with the current time.
    pub async fn append(
        &self,
        job_id: &str,
        step: impl Into<Step>,
        status: JobStatus,
        data: EventData,
    ) -> Option<i64> {
        self.record(NewJobEvent::new(job_id, now_ms(), step, status, data))
            .await
    }

    /// Append a fully built event, then relay the job's snapshot in the
    /// background.
    pub async fn record(&self, event: NewJobEvent) -> Option<i64> {
        let seq = self.insert(&event).await?;
        if self.mirror.is_some() {
            let tracker = self.clone();
            let job_id = event.job_id;
            tokio::spawn(async move {
                tracker.relay(&job_id).await;
            });
        }
        Some(seq)
    }

    /// Current snapshot of one job, enriched with its username.
    pub async fn get_trace(&self, job_id: &str) -> Option<JobSnapshot> {
        let events = match JobEventRepo::list_for_job(&self.pool, job_id).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(job_id, error = %e, "Failed to read job events");
                return None;
            }
        };
        let mut snapshot = reconstruct(&events)?;
        self.identity.enrich(&mut snapshot).await;
        Some(snapshot)
    }

    /// Snapshots of the most recently active jobs, newest first.
    pub async fn get_recent(&self, limit: i64) -> Vec<JobSnapshot> {
        let ids = match JobEventRepo::recent_job_ids(&self.pool, limit).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list recent jobs");
                return Vec::new();
            }
        };

        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(snapshot) = self.get_trace(&id).await {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Ids of jobs whose latest status update has said `running` for at
    /// least `threshold_minutes`.
    pub async fn get_stuck(&self, threshold_minutes: i64) -> Vec<String> {
        self.stuck_candidates(now_ms(), threshold_minutes).await
    }

    pub(crate) async fn stuck_candidates(
        &self,
        now: TimestampMs,
        threshold_minutes: i64,
    ) -> Vec<String> {
        let cutoff = cutoff_ms(now, threshold_minutes);
        match JobEventRepo::stuck_candidates(&self.pool, cutoff).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Failed to query stuck jobs");
                Vec::new()
            }
        }
    }

    /// Append the timeout remediation event for `job_id` and relay the
    /// updated snapshot before returning.
    pub async fn mark_failed(&self, job_id: &str) -> Option<i64> {
        self.mark_failed_at(job_id, now_ms()).await
    }

    pub(crate) async fn mark_failed_at(&self, job_id: &str, now: TimestampMs) -> Option<i64> {
        let seq = self.insert(&remediation_event(job_id, now)).await?;
        tracing::info!(job_id, "Marked stuck job as failed");
        self.relay(job_id).await;
        Some(seq)
    }

    /// Push the job's current snapshot to the observer, if one is
    /// configured. Failures are logged, never returned.
    pub async fn relay(&self, job_id: &str) -> Option<PushResponse> {
        let client = self.mirror.as_ref()?;
        let snapshot = self.get_trace(job_id).await?;
        match client.push(&snapshot).await {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                tracing::debug!(job_id, error = %e, "Snapshot relay failed");
                None
            }
        }
    }

    async fn insert(&self, event: &NewJobEvent) -> Option<i64> {
        match JobEventRepo::insert(&self.pool, event).await {
            Ok(seq) => {
                tracing::debug!(
                    job_id = %event.job_id,
                    step = event.step.as_str(),
                    status = %event.status,
                    "Recorded job event",
                );
                Some(seq)
            }
            Err(e) => {
                tracing::error!(job_id = %event.job_id, error = %e, "Failed to record job event");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use jobtrace_core::metadata::Metadata;
    use jobtrace_core::snapshot::JobType;

    use super::*;

    async fn tracker() -> JobTracker {
        let pool = jobtrace_db::create_memory_pool().await.unwrap();
        JobTracker::new(pool.clone(), IdentityResolver::new(pool))
    }

    #[tokio::test]
    async fn append_then_get_trace_reconstructs_the_job() {
        let tracker = tracker().await;
        let context = Metadata::new()
            .with("operationType", "download")
            .with("userId", "u-1")
            .with("username", "alice")
            .with("originalUrl", "https://example.com/v");

        tracker
            .append(
                "job-1",
                Step::Created,
                JobStatus::Pending,
                EventData::new().with_metadata(context),
            )
            .await
            .unwrap();
        tracker
            .append("job-1", "download_start", JobStatus::Running, EventData::new())
            .await
            .unwrap();
        tracker
            .append("job-1", Step::StatusUpdate, JobStatus::Success, EventData::new())
            .await
            .unwrap();

        let snapshot = tracker.get_trace("job-1").await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Success);
        assert_eq!(snapshot.job_type, JobType::Download);
        assert_eq!(snapshot.username.as_deref(), Some("alice"));
        assert_eq!(snapshot.original_url.as_deref(), Some("https://example.com/v"));
        assert_eq!(snapshot.steps.len(), 1);
        assert_eq!(snapshot.steps[0].status, JobStatus::Success);
        assert!(snapshot.duration.is_some());
    }

    #[tokio::test]
    async fn get_trace_enriches_username_from_registry() {
        let tracker = tracker().await;
        tracker
            .identity()
            .record_user("u-7", Some("carol"), 1)
            .await
            .unwrap();
        tracker
            .append(
                "job-1",
                Step::Created,
                JobStatus::Pending,
                EventData::new().with_metadata(
                    Metadata::new().with("userId", "u-7").with("username", "unknown"),
                ),
            )
            .await
            .unwrap();

        let snapshot = tracker.get_trace("job-1").await.unwrap();
        assert_eq!(snapshot.username.as_deref(), Some("carol"));
    }

    #[tokio::test]
    async fn unknown_job_has_no_trace() {
        let tracker = tracker().await;
        assert!(tracker.get_trace("missing").await.is_none());
    }

    #[tokio::test]
    async fn job_without_created_event_has_no_trace() {
        let tracker = tracker().await;
        tracker
            .append("job-1", Step::StatusUpdate, JobStatus::Running, EventData::new())
            .await
            .unwrap();
        assert!(tracker.get_trace("job-1").await.is_none());
    }

    #[tokio::test]
    async fn append_swallows_store_failures() {
        let tracker = tracker().await;
        tracker.pool().close().await;

        let seq = tracker
            .append("job-1", Step::Created, JobStatus::Pending, EventData::new())
            .await;
        assert!(seq.is_none());
        assert!(tracker.get_recent(10).await.is_empty());
        assert!(tracker.get_stuck(10).await.is_empty());
    }

    #[tokio::test]
    async fn get_recent_skips_jobs_without_created_event() {
        let tracker = tracker().await;
        tracker
            .record(NewJobEvent::new("a", 100, Step::Created, JobStatus::Pending, EventData::new()))
            .await
            .unwrap();
        tracker
            .record(NewJobEvent::new("orphan", 200, Step::Error, JobStatus::Error, EventData::new()))
            .await
            .unwrap();
        tracker
            .record(NewJobEvent::new("b", 300, Step::Created, JobStatus::Pending, EventData::new()))
            .await
            .unwrap();

        let ids: Vec<String> = tracker
            .get_recent(10)
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn mark_failed_without_mirror_only_appends() {
        let tracker = tracker().await;
        tracker
            .append("job-1", Step::Created, JobStatus::Pending, EventData::new())
            .await
            .unwrap();
        tracker.mark_failed("job-1").await.unwrap();

        let snapshot = tracker.get_trace("job-1").await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert!(tracker.relay("job-1").await.is_none());
    }
}
