//! In-memory mirror of the producer's live job state.
//!
//! The producer pushes a fresh snapshot after every append. Accepted
//! snapshots land in a bounded, newest-first cache and are fanned out to
//! every dashboard subscriber. Collaborators push system metrics, alerts
//! and user metrics through the same fan-out.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use axum::extract::ws::Message;
use jobtrace_core::mirror::{LiveMessage, LiveMessageType, PushResponse, RejectReason};
use jobtrace_core::snapshot::JobSnapshot;
use jobtrace_tracker::IdentityResolver;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Whether `path` names a database that is not the production event log:
/// the in-memory database, or any path component containing `test`.
pub fn is_non_production_path(path: &str) -> bool {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed.contains(":memory:") {
        return true;
    }
    Path::new(trimmed).components().any(|component| {
        component
            .as_os_str()
            .to_string_lossy()
            .to_ascii_lowercase()
            .contains("test")
    })
}

/// Sizing and rejection rules of a [`Mirror`].
#[derive(Debug, Clone)]
pub struct MirrorSettings {
    pub capacity: usize,
    pub alert_history: usize,
    pub reserved_user_ids: HashSet<String>,
    /// The observer runs against a non-production database.
    pub test_environment: bool,
}

impl MirrorSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            capacity: config.mirror_capacity,
            alert_history: config.alert_history,
            reserved_user_ids: config.reserved_test_user_ids.iter().cloned().collect(),
            test_environment: is_non_production_path(&config.database_path),
        }
    }
}

pub struct Mirror {
    settings: MirrorSettings,
    operations: RwLock<VecDeque<JobSnapshot>>,
    system_metrics: RwLock<Option<Value>>,
    alerts: RwLock<VecDeque<Value>>,
    identity: IdentityResolver,
    ws_manager: Arc<WsManager>,
}

impl Mirror {
    pub fn new(
        settings: MirrorSettings,
        identity: IdentityResolver,
        ws_manager: Arc<WsManager>,
    ) -> Self {
        if settings.test_environment {
            tracing::warn!("Non-production database detected, job snapshots will be rejected");
        }
        Self {
            operations: RwLock::new(VecDeque::with_capacity(settings.capacity)),
            system_metrics: RwLock::new(None),
            alerts: RwLock::new(VecDeque::with_capacity(settings.alert_history)),
            settings,
            identity,
            ws_manager,
        }
    }

    fn rejection(&self, snapshot: &JobSnapshot) -> Option<RejectReason> {
        if self.settings.test_environment {
            return Some(RejectReason::TestEnvironmentDetected);
        }
        let reserved = snapshot
            .user_id
            .as_ref()
            .is_some_and(|id| self.settings.reserved_user_ids.contains(id));
        reserved.then_some(RejectReason::ReservedTestIdentity)
    }

    /// Accept or reject one pushed snapshot.
    ///
    /// Rejected snapshots are neither cached nor broadcast.
    pub async fn push_operation(&self, mut snapshot: JobSnapshot) -> PushResponse {
        if let Some(reason) = self.rejection(&snapshot) {
            tracing::debug!(job_id = %snapshot.id, reason = reason.as_str(), "Rejected job snapshot");
            return PushResponse::rejected(reason);
        }

        self.identity.enrich(&mut snapshot).await;
        let message = LiveMessage::operation(&snapshot);

        {
            let mut operations = self.operations.write().await;
            if let Some(slot) = operations.iter_mut().find(|s| s.id == snapshot.id) {
                *slot = snapshot;
            } else {
                operations.push_front(snapshot);
                operations.truncate(self.settings.capacity);
            }
        }

        self.broadcast(&message).await;
        PushResponse::accepted()
    }

    /// Replace the latest system metrics snapshot and fan it out.
    pub async fn push_system_metrics(&self, metrics: Value) {
        *self.system_metrics.write().await = Some(metrics.clone());
        self.broadcast(&LiveMessage::new(LiveMessageType::SystemMetrics, metrics))
            .await;
    }

    /// Record an alert and fan it out.
    pub async fn push_alert(&self, alert: Value) {
        {
            let mut alerts = self.alerts.write().await;
            alerts.push_front(alert.clone());
            alerts.truncate(self.settings.alert_history);
        }
        self.broadcast(&LiveMessage::new(LiveMessageType::Alert, alert))
            .await;
    }

    /// Fan out user metrics. They are not kept for replay.
    pub async fn push_user_metrics(&self, metrics: Value) {
        self.broadcast(&LiveMessage::new(LiveMessageType::UserMetrics, metrics))
            .await;
    }

    /// Cached snapshots, newest first, with usernames re-resolved.
    pub async fn operations(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> =
            self.operations.read().await.iter().cloned().collect();
        for snapshot in &mut snapshots {
            self.identity.enrich(snapshot).await;
        }
        snapshots
    }

    /// Messages a new subscriber receives on connect, oldest first: the
    /// cached snapshots, the latest system metrics, then recent alerts.
    pub async fn replay(&self) -> Vec<LiveMessage> {
        let operations = self.operations.read().await;
        let system_metrics = self.system_metrics.read().await;
        let alerts = self.alerts.read().await;
        self.replay_messages(&operations, (*system_metrics).as_ref(), &alerts)
            .await
    }

    /// Register a subscriber with `ws_manager` and queue the replay ahead
    /// of any live message.
    ///
    /// The read locks are held across registration, so no push can change
    /// the cached state between the replay snapshot and the first
    /// broadcast this subscriber sees.
    pub async fn subscribe(
        &self,
        conn_id: &str,
    ) -> (UnboundedReceiver<Message>, CancellationToken) {
        let operations = self.operations.read().await;
        let system_metrics = self.system_metrics.read().await;
        let alerts = self.alerts.read().await;
        let messages = self
            .replay_messages(&operations, system_metrics.as_ref(), &alerts)
            .await;

        let subscription = self.ws_manager.add(conn_id.to_string()).await;
        for message in messages {
            self.ws_manager
                .send_to(conn_id, Message::Text(message.to_json().into()))
                .await;
        }
        subscription
    }

    async fn replay_messages(
        &self,
        operations: &VecDeque<JobSnapshot>,
        system_metrics: Option<&Value>,
        alerts: &VecDeque<Value>,
    ) -> Vec<LiveMessage> {
        let mut messages = Vec::with_capacity(operations.len() + alerts.len() + 1);
        for snapshot in operations.iter().rev() {
            let mut snapshot = snapshot.clone();
            self.identity.enrich(&mut snapshot).await;
            messages.push(LiveMessage::operation(&snapshot));
        }

        if let Some(metrics) = system_metrics {
            messages.push(LiveMessage::new(LiveMessageType::SystemMetrics, metrics.clone()));
        }

        messages.extend(
            alerts
                .iter()
                .rev()
                .cloned()
                .map(|alert| LiveMessage::new(LiveMessageType::Alert, alert)),
        );
        messages
    }

    pub async fn len(&self) -> usize {
        self.operations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.operations.read().await.is_empty()
    }

    async fn broadcast(&self, message: &LiveMessage) {
        self.ws_manager
            .broadcast(Message::Text(message.to_json().into()))
            .await;
    }
}
