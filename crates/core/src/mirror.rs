//! Wire types shared by the producer and the dashboard observer.

use serde::{Deserialize, Serialize};

use crate::snapshot::JobSnapshot;

/// Route on the observer that accepts pushed job snapshots.
pub const PUSH_OPERATION_PATH: &str = "/api/v1/mirror/operations";

/// Why the observer refused a pushed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// The observer itself runs against a non-production database.
    TestEnvironmentDetected,
    /// The job belongs to a reserved synthetic test user.
    ReservedTestIdentity,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::TestEnvironmentDetected => "test-environment-detected",
            RejectReason::ReservedTestIdentity => "reserved-test-identity",
        }
    }
}

/// Observer's answer to a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl PushResponse {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }
}

/// Tag of a live fan-out envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveMessageType {
    Operation,
    SystemMetrics,
    Alert,
    UserMetrics,
}

/// `{type, data}` envelope sent to every live dashboard subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveMessage {
    #[serde(rename = "type")]
    pub kind: LiveMessageType,
    pub data: serde_json::Value,
}

impl LiveMessage {
    pub fn new(kind: LiveMessageType, data: serde_json::Value) -> Self {
        Self { kind, data }
    }

    pub fn operation(snapshot: &JobSnapshot) -> Self {
        let data = serde_json::to_value(snapshot).unwrap_or_default();
        Self::new(LiveMessageType::Operation, data)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
