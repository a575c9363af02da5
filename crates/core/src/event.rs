//! Immutable job events as stored in the event log.

use serde::{Deserialize, Serialize};

use crate::metadata::Metadata;
use crate::status::JobStatus;
use crate::types::{JobId, TimestampMs};

/// Step tag of the single creation event that opens every job.
pub const STEP_CREATED: &str = "created";

/// Step tag of a job-level status change.
pub const STEP_STATUS_UPDATE: &str = "status_update";

/// Step tag of an error report.
pub const STEP_ERROR: &str = "error";

/// What an event describes.
///
/// Three tags are reserved; any other tag names a producer-defined
/// execution step (e.g. `download_start`, `gif_conversion`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Step {
    Created,
    StatusUpdate,
    Error,
    Execution(String),
}

impl Step {
    pub fn parse(tag: &str) -> Self {
        match tag {
            STEP_CREATED => Step::Created,
            STEP_STATUS_UPDATE => Step::StatusUpdate,
            STEP_ERROR => Step::Error,
            other => Step::Execution(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Step::Created => STEP_CREATED,
            Step::StatusUpdate => STEP_STATUS_UPDATE,
            Step::Error => STEP_ERROR,
            Step::Execution(name) => name,
        }
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, Step::Execution(_))
    }
}

impl From<String> for Step {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            STEP_CREATED => Step::Created,
            STEP_STATUS_UPDATE => Step::StatusUpdate,
            STEP_ERROR => Step::Error,
            _ => Step::Execution(tag),
        }
    }
}

impl From<&str> for Step {
    fn from(tag: &str) -> Self {
        Step::parse(tag)
    }
}

impl From<Step> for String {
    fn from(step: Step) -> Self {
        match step {
            Step::Execution(name) => name,
            reserved => reserved.as_str().to_string(),
        }
    }
}

/// One stored event.
///
/// `metadata` is kept as the raw stored text. Parsing is the reader's job
/// so that a malformed payload only costs that one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    /// Insertion sequence; breaks ties between equal timestamps.
    pub seq: i64,
    pub job_id: JobId,
    pub timestamp: TimestampMs,
    pub step: Step,
    pub status: JobStatus,
    pub message: Option<String>,
    pub file_path: Option<String>,
    pub stack_trace: Option<String>,
    pub metadata: Option<String>,
}

/// Optional payload of an append call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventData {
    pub message: Option<String>,
    pub file_path: Option<String>,
    pub stack_trace: Option<String>,
    pub metadata: Option<Metadata>,
}

impl EventData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// An event about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJobEvent {
    pub job_id: JobId,
    pub timestamp: TimestampMs,
    pub step: Step,
    pub status: JobStatus,
    pub data: EventData,
}

impl NewJobEvent {
    pub fn new(
        job_id: impl Into<JobId>,
        timestamp: TimestampMs,
        step: impl Into<Step>,
        status: JobStatus,
        data: EventData,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            timestamp,
            step: step.into(),
            status,
            data,
        }
    }

    /// Metadata rendered for storage, if any.
    pub fn metadata_json(&self) -> Option<String> {
        self.data.metadata.as_ref().map(Metadata::to_json_string)
    }
}
