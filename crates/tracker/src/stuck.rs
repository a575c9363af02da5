//! Sweep that finds abandoned jobs and marks them failed.
//!
//! The candidate query can race with a job that is just finishing, so every
//! candidate is re-read and re-checked with [`is_stuck`] before the
//! remediation event is appended.

use std::time::Duration;

use jobtrace_core::reconstruct::reconstruct;
use jobtrace_core::snapshot::JobType;
use jobtrace_core::stuck::{cutoff_ms, is_stuck, latest_status_update};
use jobtrace_core::types::{now_ms, JobId, TimestampMs};
use jobtrace_db::repositories::JobEventRepo;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::tracker::JobTracker;

/// One job the sweep marked as failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StuckJobReport {
    pub job_id: JobId,
    pub user_id: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub start_time: TimestampMs,
    /// Timestamp of the `running` update the job never moved past.
    pub last_update: TimestampMs,
}

pub struct StuckJobDetector {
    tracker: JobTracker,
    threshold_minutes: i64,
}

impl StuckJobDetector {
    pub fn new(tracker: JobTracker, threshold_minutes: i64) -> Self {
        Self {
            tracker,
            threshold_minutes,
        }
    }

    pub fn threshold_minutes(&self) -> i64 {
        self.threshold_minutes
    }

    pub async fn sweep(&self) -> Vec<StuckJobReport> {
        self.sweep_at(now_ms()).await
    }

    /// Run one sweep as if the clock read `now`.
    pub async fn sweep_at(&self, now: TimestampMs) -> Vec<StuckJobReport> {
        let cutoff = cutoff_ms(now, self.threshold_minutes);
        let candidates = self
            .tracker
            .stuck_candidates(now, self.threshold_minutes)
            .await;
        if candidates.is_empty() {
            tracing::debug!(threshold_minutes = self.threshold_minutes, "No stuck jobs");
            return Vec::new();
        }

        let mut reports = Vec::with_capacity(candidates.len());
        for job_id in candidates {
            let events = match JobEventRepo::list_for_job(self.tracker.pool(), &job_id).await {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Failed to re-read stuck candidate");
                    continue;
                }
            };
            if !is_stuck(&events, cutoff) {
                tracing::debug!(job_id = %job_id, "Stuck candidate progressed, skipping");
                continue;
            }

            let last_update = latest_status_update(&events)
                .map(|e| e.timestamp)
                .unwrap_or_default();
            let mut snapshot = reconstruct(&events);
            if let Some(snapshot) = snapshot.as_mut() {
                self.tracker.identity().enrich(snapshot).await;
            }

            let report = match snapshot {
                Some(s) => StuckJobReport {
                    job_id: job_id.clone(),
                    user_id: s.user_id,
                    username: s.username,
                    job_type: s.job_type,
                    start_time: s.start_time,
                    last_update,
                },
                None => StuckJobReport {
                    job_id: job_id.clone(),
                    user_id: None,
                    username: None,
                    job_type: JobType::Unknown,
                    start_time: last_update,
                    last_update,
                },
            };

            tracing::warn!(
                job_id = %job_id,
                user_id = report.user_id.as_deref().unwrap_or("-"),
                username = report.username.as_deref().unwrap_or("-"),
                job_type = report.job_type.as_str(),
                start_time = report.start_time,
                "Job stuck in running, marking failed",
            );

            if self.tracker.mark_failed_at(&job_id, now).await.is_some() {
                reports.push(report);
            }
        }
        reports
    }

    /// Sweep every `interval` until `cancel` fires.
    pub async fn run(self, interval: Duration, cancel: CancellationToken) {
        tracing::info!(
            threshold_minutes = self.threshold_minutes,
            interval_secs = interval.as_secs(),
            "Stuck job sweep started"
        );

        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Stuck job sweep stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let reports = self.sweep().await;
                    if !reports.is_empty() {
                        tracing::info!(remediated = reports.len(), "Stuck job sweep: marked jobs failed");
                    }
                }
            }
        }
    }
}
