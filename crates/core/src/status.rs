//! Closed job status enum and the display-status transition rules.
//!
//! Stored events keep the status they were written with. The rules here
//! only compute what a reader should *display* for an event once the job's
//! final outcome is known.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status carried by every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Error,
}

impl JobStatus {
    /// String representation for database storage.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        }
    }

    /// `success` and `error` end a job; nothing moves it out of them except
    /// a later event.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }

    /// Displayed status of an execution step given the job's final status.
    ///
    /// A step still marked `running` inherits a terminal final status.
    /// Every other combination is shown as recorded.
    pub fn display_for_step(self, final_status: JobStatus) -> JobStatus {
        match (self, final_status) {
            (JobStatus::Running, final_status) if final_status.is_terminal() => final_status,
            (recorded, _) => recorded,
        }
    }

    /// Displayed status of the `created` event.
    ///
    /// A pending creation is shown as `success` once any execution step
    /// has been recorded for the job.
    pub fn display_for_created(self, has_execution_steps: bool) -> JobStatus {
        match self {
            JobStatus::Pending if has_execution_steps => JobStatus::Success,
            recorded => recorded,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "error" => Ok(JobStatus::Error),
            other => Err(CoreError::Validation(format!("unknown job status '{other}'"))),
        }
    }
}
