//! Rebuild a job snapshot from its event history.
//!
//! [`reconstruct`] is a pure, total function: it borrows the stored events,
//! never modifies them, and degrades individual fields instead of failing.
//! Username enrichment against the user registry happens one layer up;
//! this module only takes what the creation event carried.

use std::collections::HashSet;

use crate::event::{JobEvent, Step};
use crate::metadata::{keys, Metadata};
use crate::snapshot::{EventView, JobSnapshot, JobType, StepView};
use crate::status::JobStatus;

/// One stored event with its metadata decoded.
struct Parsed<'a> {
    event: &'a JobEvent,
    metadata: Option<Metadata>,
}

impl<'a> Parsed<'a> {
    fn new(event: &'a JobEvent) -> Self {
        let metadata = event.metadata.as_deref().and_then(|raw| {
            match Metadata::parse(raw) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    tracing::warn!(
                        job_id = %event.job_id,
                        seq = event.seq,
                        step = event.step.as_str(),
                        error = %e,
                        "Ignoring malformed event metadata",
                    );
                    None
                }
            }
        });
        Self { event, metadata }
    }

    fn meta_str(&self, key: &str) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| m.str(key))
            .map(str::to_string)
    }

    fn meta_i64(&self, key: &str) -> Option<i64> {
        self.metadata.as_ref().and_then(|m| m.i64(key))
    }
}

/// Error details resolved from error events and status updates.
#[derive(Default)]
struct FailureDetails {
    error: Option<String>,
    stack_trace: Option<String>,
    file_size: Option<i64>,
}

/// Rebuild the snapshot of one job.
///
/// Returns `None` when the history has no `created` event. Events are
/// considered in `(timestamp, seq)` order regardless of input order.
pub fn reconstruct(events: &[JobEvent]) -> Option<JobSnapshot> {
    let mut ordered: Vec<&JobEvent> = events.iter().collect();
    ordered.sort_by_key(|e| (e.timestamp, e.seq));
    let parsed: Vec<Parsed<'_>> = ordered.into_iter().map(Parsed::new).collect();

    let created = parsed.iter().find(|p| p.event.step == Step::Created)?;
    let empty = Metadata::new();
    let context = created.metadata.as_ref().unwrap_or(&empty);

    let status_updates: Vec<&Parsed<'_>> = parsed
        .iter()
        .filter(|p| p.event.step == Step::StatusUpdate)
        .collect();
    let latest_status = status_updates.last().copied().unwrap_or(created);
    let final_status = latest_status.event.status;
    let start_time = created.event.timestamp;

    let details = resolve_failure_details(&parsed, &status_updates, context);
    let has_execution_steps = parsed.iter().any(|p| p.event.step.is_execution());

    let steps: Vec<StepView> = parsed
        .iter()
        .filter(|p| p.event.step.is_execution())
        .map(|p| StepView {
            name: p.event.step.as_str().to_string(),
            status: p.event.status.display_for_step(final_status),
            timestamp: p.event.timestamp,
            duration: p.event.timestamp - start_time,
            message: p.event.message.clone(),
            file_path: p.event.file_path.clone(),
            metadata: p.metadata.clone(),
        })
        .collect();

    let timeline: Vec<EventView> = parsed
        .iter()
        .map(|p| EventView {
            step: p.event.step.as_str().to_string(),
            status: display_status(p.event, final_status, has_execution_steps),
            recorded_status: p.event.status,
            timestamp: p.event.timestamp,
            message: p.event.message.clone(),
            file_path: p.event.file_path.clone(),
        })
        .collect();

    let duration = final_status
        .is_terminal()
        .then(|| latest_status.event.timestamp - start_time);

    let last_activity = parsed
        .iter()
        .map(|p| p.event.timestamp)
        .max()
        .unwrap_or(start_time);

    Some(JobSnapshot {
        id: created.event.job_id.clone(),
        job_type: resolve_job_type(context, &parsed),
        status: final_status,
        user_id: context.string(keys::USER_ID),
        username: context.known_str(keys::USERNAME).map(str::to_string),
        original_url: context.str(keys::ORIGINAL_URL).map(str::to_string),
        file_size: details.file_size,
        timestamp: last_activity,
        start_time,
        error: details.error,
        stack_trace: details.stack_trace,
        file_paths: collect_file_paths(&parsed),
        duration,
        steps,
        timeline,
    })
}

/// Status shown for one event in the timeline.
fn display_status(event: &JobEvent, final_status: JobStatus, has_execution_steps: bool) -> JobStatus {
    match event.step {
        Step::Created => event.status.display_for_created(has_execution_steps),
        Step::Execution(_) => event.status.display_for_step(final_status),
        Step::StatusUpdate | Step::Error => event.status,
    }
}

/// Latest error event first, then status updates newest-first. The first
/// populated value per field wins.
fn resolve_failure_details(
    parsed: &[Parsed<'_>],
    status_updates: &[&Parsed<'_>],
    context: &Metadata,
) -> FailureDetails {
    let mut details = FailureDetails::default();

    if let Some(error_event) = parsed.iter().rev().find(|p| p.event.step == Step::Error) {
        details.error = error_event
            .event
            .message
            .clone()
            .or_else(|| error_event.meta_str(keys::ERROR));
        details.stack_trace = error_event
            .event
            .stack_trace
            .clone()
            .or_else(|| error_event.meta_str(keys::STACK_TRACE));
    }

    for update in status_updates.iter().rev() {
        if details.error.is_none() {
            details.error = update.meta_str(keys::ERROR).or_else(|| {
                (update.event.status == JobStatus::Error)
                    .then(|| update.event.message.clone())
                    .flatten()
            });
        }
        if details.stack_trace.is_none() {
            details.stack_trace = update
                .event
                .stack_trace
                .clone()
                .or_else(|| update.meta_str(keys::STACK_TRACE));
        }
        if details.file_size.is_none() {
            details.file_size = update.meta_i64(keys::FILE_SIZE);
        }
        if details.error.is_some() && details.stack_trace.is_some() && details.file_size.is_some()
        {
            break;
        }
    }

    if details.file_size.is_none() {
        details.file_size = context.i64(keys::FILE_SIZE);
    }

    details
}

/// Every event's file path, deduplicated, first-seen order.
fn collect_file_paths(parsed: &[Parsed<'_>]) -> Vec<String> {
    let mut seen = HashSet::new();
    parsed
        .iter()
        .filter_map(|p| p.event.file_path.as_deref())
        .filter(|path| seen.insert(*path))
        .map(str::to_string)
        .collect()
}

/// Explicit operation type when the producer recorded one, otherwise a
/// guess from the step names.
fn resolve_job_type(context: &Metadata, parsed: &[Parsed<'_>]) -> JobType {
    if let Some(explicit) = context.known_str(keys::OPERATION_TYPE) {
        return JobType::from(explicit.to_string());
    }
    let names: Vec<&str> = parsed.iter().map(|p| p.event.step.as_str()).collect();
    infer_job_type(&names)
}

/// Infer a job type from step names, in priority order.
pub fn infer_job_type(step_names: &[&str]) -> JobType {
    let joined = step_names.join(" ").to_lowercase();

    if ["conversion", "gif", "convert"]
        .iter()
        .any(|needle| joined.contains(needle))
    {
        JobType::Convert
    } else if ["optimization", "optimize"]
        .iter()
        .any(|needle| joined.contains(needle))
    {
        JobType::Optimize
    } else if joined.contains("download") && !joined.contains("conversion") {
        JobType::Download
    } else {
        JobType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(seq: i64, timestamp: i64, step: &str, status: JobStatus) -> JobEvent {
        JobEvent {
            seq,
            job_id: "job-1".into(),
            timestamp,
            step: Step::parse(step),
            status,
            message: None,
            file_path: None,
            stack_trace: None,
            metadata: None,
        }
    }

    fn with_meta(mut event: JobEvent, meta: serde_json::Value) -> JobEvent {
        event.metadata = Some(meta.to_string());
        event
    }

    #[test]
    fn missing_created_event_yields_none() {
        let events = vec![
            event(1, 1000, "status_update", JobStatus::Running),
            event(2, 1100, "download_start", JobStatus::Running),
        ];
        assert!(reconstruct(&events).is_none());
        assert!(reconstruct(&[]).is_none());
    }

    #[test]
    fn terminal_status_sets_duration_from_latest_update() {
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            event(2, 1050, "status_update", JobStatus::Running),
            event(3, 2000, "status_update", JobStatus::Success),
        ];
        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.status, JobStatus::Success);
        assert_eq!(snapshot.duration, Some(1000));
        assert_eq!(snapshot.start_time, 1000);
        assert_eq!(snapshot.timestamp, 2000);
    }

    #[test]
    fn live_job_has_no_duration() {
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            event(2, 1050, "status_update", JobStatus::Running),
        ];
        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.duration, None);
    }

    #[test]
    fn created_status_is_final_without_updates() {
        let events = vec![event(1, 1000, "created", JobStatus::Pending)];
        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.status, JobStatus::Pending);
        assert_eq!(snapshot.duration, None);
    }

    #[test]
    fn running_steps_display_final_status_without_touching_events() {
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            event(2, 1100, "download_start", JobStatus::Running),
            event(3, 1500, "download_complete", JobStatus::Success),
            event(4, 1600, "status_update", JobStatus::Error),
        ];
        let before = events.clone();
        let snapshot = reconstruct(&events).unwrap();

        assert_eq!(snapshot.steps.len(), 2);
        assert_eq!(snapshot.steps[0].status, JobStatus::Error);
        assert_eq!(snapshot.steps[0].duration, 100);
        assert_eq!(snapshot.steps[1].status, JobStatus::Success);
        assert_eq!(events, before);
        assert_eq!(snapshot.timeline[1].recorded_status, JobStatus::Running);
    }

    #[test]
    fn created_is_promoted_in_timeline_once_steps_exist() {
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            event(2, 1100, "download_start", JobStatus::Running),
        ];
        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.timeline[0].step, "created");
        assert_eq!(snapshot.timeline[0].status, JobStatus::Success);
        assert_eq!(snapshot.timeline[0].recorded_status, JobStatus::Pending);

        let bare = reconstruct(&events[..1]).unwrap();
        assert_eq!(bare.timeline[0].status, JobStatus::Pending);
    }

    #[test]
    fn steps_exclude_reserved_tags() {
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            event(2, 1100, "status_update", JobStatus::Running),
            event(3, 1200, "error", JobStatus::Error),
            event(4, 1300, "optimize_start", JobStatus::Running),
        ];
        let snapshot = reconstruct(&events).unwrap();
        let names: Vec<&str> = snapshot.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["optimize_start"]);
        assert_eq!(snapshot.timeline.len(), 4);
    }

    #[test]
    fn infers_download_from_step_names() {
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            event(2, 1100, "download_start", JobStatus::Running),
            event(3, 1200, "download_complete", JobStatus::Success),
        ];
        assert_eq!(reconstruct(&events).unwrap().job_type, JobType::Download);
    }

    #[test]
    fn infers_convert_from_gif_conversion_step() {
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            event(2, 1100, "download_complete", JobStatus::Success),
            event(3, 1200, "gif_conversion", JobStatus::Running),
        ];
        assert_eq!(reconstruct(&events).unwrap().job_type, JobType::Convert);
    }

    #[test]
    fn inference_priority_order() {
        assert_eq!(infer_job_type(&["optimize_start"]), JobType::Optimize);
        assert_eq!(infer_job_type(&["Image_Optimization"]), JobType::Optimize);
        assert_eq!(
            infer_job_type(&["download", "optimization"]),
            JobType::Optimize
        );
        assert_eq!(infer_job_type(&["created", "status_update"]), JobType::Unknown);
    }

    #[test]
    fn explicit_operation_type_wins_unless_unknown() {
        let explicit = vec![
            with_meta(
                event(1, 1000, "created", JobStatus::Pending),
                json!({"operationType": "optimize"}),
            ),
            event(2, 1100, "download_start", JobStatus::Running),
        ];
        assert_eq!(reconstruct(&explicit).unwrap().job_type, JobType::Optimize);

        let placeholder = vec![
            with_meta(
                event(1, 1000, "created", JobStatus::Pending),
                json!({"operationType": "unknown"}),
            ),
            event(2, 1100, "download_start", JobStatus::Running),
        ];
        assert_eq!(
            reconstruct(&placeholder).unwrap().job_type,
            JobType::Download
        );
    }

    #[test]
    fn username_placeholder_is_never_surfaced() {
        let events = vec![with_meta(
            event(1, 1000, "created", JobStatus::Pending),
            json!({"userId": "u-42", "username": "unknown"}),
        )];
        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.user_id.as_deref(), Some("u-42"));
        assert_eq!(snapshot.username, None);
        assert!(snapshot.needs_username());
    }

    #[test]
    fn context_fields_are_copied() {
        let events = vec![with_meta(
            event(1, 1000, "created", JobStatus::Pending),
            json!({
                "userId": "u-42",
                "username": "alice",
                "originalUrl": "https://cdn.example.com/v.mp4",
            }),
        )];
        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.username.as_deref(), Some("alice"));
        assert_eq!(
            snapshot.original_url.as_deref(),
            Some("https://cdn.example.com/v.mp4")
        );
    }

    #[test]
    fn malformed_metadata_only_drops_that_field() {
        let mut created = event(1, 1000, "created", JobStatus::Pending);
        created.metadata = Some("{broken".into());
        created.file_path = Some("/tmp/in.mp4".into());
        let events = vec![created, event(2, 1100, "download_start", JobStatus::Running)];

        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.user_id, None);
        assert_eq!(snapshot.job_type, JobType::Download);
        assert_eq!(snapshot.file_paths, vec!["/tmp/in.mp4".to_string()]);
    }

    #[test]
    fn error_event_wins_over_status_updates() {
        let mut failure = event(3, 1300, "error", JobStatus::Error);
        failure.message = Some("ffmpeg exited with 1".into());
        failure.stack_trace = Some("at convert()".into());
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            with_meta(
                event(2, 1200, "status_update", JobStatus::Running),
                json!({"error": "older", "fileSize": 2048}),
            ),
            failure,
            with_meta(
                event(4, 1400, "status_update", JobStatus::Error),
                json!({"error": "newer update error"}),
            ),
        ];
        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.error.as_deref(), Some("ffmpeg exited with 1"));
        assert_eq!(snapshot.stack_trace.as_deref(), Some("at convert()"));
        assert_eq!(snapshot.file_size, Some(2048));
    }

    #[test]
    fn status_updates_fill_fields_newest_first() {
        let mut newest = event(4, 1400, "status_update", JobStatus::Error);
        newest.message = Some("timed out".into());
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            with_meta(
                event(2, 1100, "status_update", JobStatus::Running),
                json!({"stackTrace": "trace-a", "fileSize": 100}),
            ),
            with_meta(
                event(3, 1200, "status_update", JobStatus::Running),
                json!({"fileSize": 300}),
            ),
            newest,
        ];
        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.error.as_deref(), Some("timed out"));
        assert_eq!(snapshot.stack_trace.as_deref(), Some("trace-a"));
        assert_eq!(snapshot.file_size, Some(300));
    }

    #[test]
    fn file_paths_are_deduplicated_in_first_seen_order() {
        let mut a = event(2, 1100, "download_complete", JobStatus::Success);
        a.file_path = Some("/out/b.mp4".into());
        let mut b = event(3, 1200, "gif_conversion", JobStatus::Success);
        b.file_path = Some("/out/a.gif".into());
        let mut c = event(4, 1300, "status_update", JobStatus::Success);
        c.file_path = Some("/out/b.mp4".into());
        let events = vec![event(1, 1000, "created", JobStatus::Pending), a, b, c];
        assert_eq!(
            reconstruct(&events).unwrap().file_paths,
            vec!["/out/b.mp4".to_string(), "/out/a.gif".to_string()]
        );
    }

    #[test]
    fn unordered_input_is_ordered_by_timestamp_then_seq() {
        let events = vec![
            event(3, 2000, "status_update", JobStatus::Success),
            event(2, 1500, "status_update", JobStatus::Running),
            event(1, 1000, "created", JobStatus::Pending),
        ];
        let snapshot = reconstruct(&events).unwrap();
        assert_eq!(snapshot.status, JobStatus::Success);
        assert_eq!(snapshot.duration, Some(1000));
    }

    #[test]
    fn equal_timestamps_break_ties_by_insertion() {
        let events = vec![
            event(1, 1000, "created", JobStatus::Pending),
            event(2, 1500, "status_update", JobStatus::Success),
            event(3, 1500, "status_update", JobStatus::Error),
        ];
        assert_eq!(reconstruct(&events).unwrap().status, JobStatus::Error);
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let events = vec![
            with_meta(
                event(1, 1000, "created", JobStatus::Pending),
                json!({"userId": "u-1", "operationType": "convert"}),
            ),
            event(2, 1100, "gif_conversion", JobStatus::Running),
            event(3, 1900, "status_update", JobStatus::Success),
        ];
        assert_eq!(reconstruct(&events), reconstruct(&events));
    }
}
