//! Derived job snapshot served to operators and the live dashboard.

use serde::{Deserialize, Serialize};

use crate::metadata::{is_placeholder, Metadata, UNKNOWN};
use crate::status::JobStatus;
use crate::types::{JobId, TimestampMs};

/// Kind of media work a job performs.
///
/// Producers may name arbitrary operation types; those survive as
/// [`JobType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    Download,
    Convert,
    Optimize,
    Unknown,
    Other(String),
}

impl JobType {
    pub fn as_str(&self) -> &str {
        match self {
            JobType::Download => "download",
            JobType::Convert => "convert",
            JobType::Optimize => "optimize",
            JobType::Unknown => UNKNOWN,
            JobType::Other(name) => name,
        }
    }
}

impl From<String> for JobType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "download" => JobType::Download,
            "convert" => JobType::Convert,
            "optimize" => JobType::Optimize,
            s if is_placeholder(s) => JobType::Unknown,
            _ => JobType::Other(name),
        }
    }
}

impl From<JobType> for String {
    fn from(job_type: JobType) -> Self {
        match job_type {
            JobType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Derived view of one execution step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub name: String,
    /// Display status (running steps inherit a terminal job status).
    pub status: JobStatus,
    pub timestamp: TimestampMs,
    /// Milliseconds since the job was created.
    pub duration: i64,
    pub message: Option<String>,
    pub file_path: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Derived view of one stored event, in log order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub step: String,
    /// Status shown to readers.
    pub status: JobStatus,
    /// Status exactly as stored.
    pub recorded_status: JobStatus,
    pub timestamp: TimestampMs,
    pub message: Option<String>,
    pub file_path: Option<String>,
}

/// Current state of a job, rebuilt from its full event history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub user_id: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    pub file_size: Option<i64>,
    /// Last activity: the newest event timestamp.
    pub timestamp: TimestampMs,
    pub start_time: TimestampMs,
    pub error: Option<String>,
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub file_paths: Vec<String>,
    /// Set once the job reached a terminal status.
    pub duration: Option<i64>,
    #[serde(default)]
    pub steps: Vec<StepView>,
    #[serde(default)]
    pub timeline: Vec<EventView>,
}

impl JobSnapshot {
    /// Whether identity enrichment could still fill in the username.
    pub fn needs_username(&self) -> bool {
        self.username.is_none() && self.user_id.is_some()
    }

    /// Install a resolved username. Placeholders are ignored so the
    /// `unknown` sentinel never reaches a reader.
    pub fn apply_username(&mut self, username: Option<String>) {
        if let Some(name) = username.filter(|n| !is_placeholder(n)) {
            self.username = Some(name);
        }
    }

    /// Strip placeholder values a foreign producer may have sent.
    pub fn scrub_placeholders(&mut self) {
        if self.username.as_deref().is_some_and(is_placeholder) {
            self.username = None;
        }
        if self.user_id.as_deref().is_some_and(is_placeholder) {
            self.user_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_round_trips_known_and_custom_names() {
        assert_eq!(JobType::from("download".to_string()), JobType::Download);
        assert_eq!(JobType::from("unknown".to_string()), JobType::Unknown);
        assert_eq!(
            JobType::from("resize".to_string()),
            JobType::Other("resize".into())
        );
        assert_eq!(String::from(JobType::Other("resize".into())), "resize");
    }

    #[test]
    fn apply_username_ignores_placeholders() {
        let mut snapshot = sample();
        snapshot.apply_username(Some("unknown".into()));
        assert_eq!(snapshot.username, None);
        snapshot.apply_username(None);
        assert_eq!(snapshot.username, None);
        snapshot.apply_username(Some("alice".into()));
        assert_eq!(snapshot.username.as_deref(), Some("alice"));
        assert!(!snapshot.needs_username());
    }

    #[test]
    fn serializes_type_field_and_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "download");
        assert_eq!(json["startTime"], 1000);
        assert_eq!(json["userId"], "u-1");
        assert!(json["filePaths"].is_array());
    }

    #[test]
    fn scrub_placeholders_clears_unknown_identity() {
        let mut snapshot = sample();
        snapshot.username = Some("unknown".into());
        snapshot.scrub_placeholders();
        assert_eq!(snapshot.username, None);
        assert_eq!(snapshot.user_id.as_deref(), Some("u-1"));
    }

    fn sample() -> JobSnapshot {
        JobSnapshot {
            id: "job-1".into(),
            job_type: JobType::Download,
            status: JobStatus::Running,
            user_id: Some("u-1".into()),
            username: None,
            original_url: None,
            file_size: None,
            timestamp: 1000,
            start_time: 1000,
            error: None,
            stack_trace: None,
            file_paths: Vec::new(),
            duration: None,
            steps: Vec::new(),
            timeline: Vec::new(),
        }
    }
}
