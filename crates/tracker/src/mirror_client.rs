//! HTTP client that pushes job snapshots to the dashboard observer.
//!
//! Delivery is a single best-effort POST. There is no retry: the next
//! append for the same job pushes a fresher snapshot anyway, and the
//! observer replaces cached snapshots in place.

use std::time::Duration;

use jobtrace_core::mirror::{PushResponse, PUSH_OPERATION_PATH};
use jobtrace_core::snapshot::JobSnapshot;

/// HTTP request timeout for a single push.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The observer returned a non-2xx status code.
    #[error("Observer returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// MirrorClient
// ---------------------------------------------------------------------------

/// Pushes snapshots to `{base_url}/api/v1/mirror/operations`.
pub struct MirrorClient {
    client: reqwest::Client,
    endpoint: String,
}

impl MirrorClient {
    pub fn new(base_url: &str) -> Result<Self, MirrorError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{PUSH_OPERATION_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Push one snapshot and return the observer's verdict.
    ///
    /// A rejection is a successful exchange; it is logged here and returned
    /// as `Ok` so callers can tell it apart from transport failures.
    pub async fn push(&self, snapshot: &JobSnapshot) -> Result<PushResponse, MirrorError> {
        let response = self.client.post(&self.endpoint).json(snapshot).send().await?;
        if !response.status().is_success() {
            return Err(MirrorError::HttpStatus(response.status().as_u16()));
        }

        let verdict: PushResponse = response.json().await?;
        if !verdict.accepted {
            tracing::warn!(
                job_id = %snapshot.id,
                reason = verdict.reason.map(|r| r.as_str()).unwrap_or("unspecified"),
                "Observer rejected job snapshot",
            );
        }
        Ok(verdict)
    }
}
