//! Audit trail ports and the asynchronous audit recorder.
//!
//! Successful mutations append immutable audit events; denied mutating
//! attempts land in a separate denied-attempts table. Audit writes never
//! block the response path and never fail the business mutation: they run on
//! a dedicated writer task that the composition root drains at shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use obratrack_core::{AppError, AppResult};
use obratrack_domain::{Action, AuditAction, AuthenticatedUser, Resource, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::AuthorizationService;

/// Client metadata captured from the transport layer for audit records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    /// Remote IP address, if known.
    pub ip_address: Option<String>,
    /// User-Agent header, if presented.
    pub user_agent: Option<String>,
}

/// Immutable audit event payload emitted after a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// Actor that performed the mutation.
    pub user_id: UserId,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Resource type the mutation touched.
    pub resource: Resource,
    /// Resource identifier, when one exists.
    pub resource_id: Option<String>,
    /// Serialized before/after values or request payload.
    pub details: Option<serde_json::Value>,
    /// Client metadata from the originating request.
    pub client: ClientMeta,
}

/// Audit log read model row.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    /// Stable entry id.
    pub entry_id: String,
    /// Actor that performed the mutation.
    pub user_id: UserId,
    /// Storage value of the audit action.
    pub action: String,
    /// Storage value of the resource type.
    pub resource: String,
    /// Resource identifier, when one was recorded.
    pub resource_id: Option<String>,
    /// Serialized before/after detail payload.
    pub details: Option<serde_json::Value>,
    /// Remote IP captured with the entry.
    pub ip_address: Option<String>,
    /// User agent captured with the entry.
    pub user_agent: Option<String>,
    /// Creation timestamp in RFC3339.
    pub created_at: String,
}

/// Filter parameters for audit log listings.
#[derive(Debug, Clone, Default)]
pub struct AuditLogQuery {
    /// Maximum rows to return.
    pub limit: usize,
    /// Rows to skip.
    pub offset: usize,
    /// Restrict to one action storage value.
    pub action: Option<String>,
    /// Restrict to one actor.
    pub user_id: Option<UserId>,
}

/// Port for persisting append-only audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

/// Port for audit log read models.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists recent audit entries matching the query, newest first.
    async fn list_recent_entries(&self, query: AuditLogQuery) -> AppResult<Vec<AuditLogEntry>>;
}

/// Reason a mutating attempt was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Actor's sector does not cover the resource sector.
    SectorMismatch,
    /// Role holds no grant for the action.
    NoPermission,
    /// Deletion guard blocked the attempt.
    NonDeletable,
}

impl DenialReason {
    /// Returns the stable storage value for this reason.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SectorMismatch => "sector_mismatch",
            Self::NoPermission => "no_permission",
            Self::NonDeletable => "non_deletable",
        }
    }
}

/// Record of a denied mutating attempt, kept apart from the audit log of
/// successful mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedAttempt {
    /// Actor whose attempt was denied.
    pub user_id: UserId,
    /// Resource the actor targeted.
    pub resource: Resource,
    /// Action the actor attempted.
    pub action: Action,
    /// Denial reason category.
    pub reason: DenialReason,
    /// Human-readable denial detail.
    pub detail: String,
}

/// Denied-attempt read model row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedAttemptEntry {
    /// Stable entry id.
    pub entry_id: String,
    /// Actor whose attempt was denied.
    pub user_id: UserId,
    /// Storage value of the targeted resource.
    pub resource: String,
    /// Storage value of the attempted action.
    pub action: String,
    /// Storage value of the denial reason.
    pub reason: String,
    /// Human-readable denial detail.
    pub detail: String,
    /// Creation timestamp in RFC3339.
    pub created_at: String,
}

/// Port for persisting and listing denied mutating attempts.
#[async_trait]
pub trait DeniedAttemptRepository: Send + Sync {
    /// Persists one denied attempt.
    async fn append_attempt(&self, attempt: DeniedAttempt) -> AppResult<()>;

    /// Lists recent denied attempts, newest first.
    async fn list_recent_attempts(
        &self,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<DeniedAttemptEntry>>;
}

enum WriterMessage {
    Event(AuditEvent),
    Shutdown,
}

/// Non-blocking audit recorder.
///
/// `record` hands the event to a dedicated writer task and returns
/// immediately; the writer persists entries in order and logs failures at
/// error severity without propagating them. `AuditDrain::drain` flushes
/// everything accepted before shutdown.
#[derive(Clone)]
pub struct AuditRecorder {
    sender: mpsc::UnboundedSender<WriterMessage>,
}

/// Handle used by the composition root to flush the audit writer.
pub struct AuditDrain {
    sender: mpsc::UnboundedSender<WriterMessage>,
    writer: JoinHandle<()>,
}

impl AuditRecorder {
    /// Spawns the writer task and returns the recorder plus its drain handle.
    #[must_use]
    pub fn spawn(repository: Arc<dyn AuditRepository>) -> (Self, AuditDrain) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<WriterMessage>();

        let writer = tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                match message {
                    WriterMessage::Event(event) => {
                        if let Err(error) = repository.append_event(event).await {
                            let error = AppError::AuditWriteFailed(error.to_string());
                            error!(%error, "audit entry lost after successful mutation");
                        }
                    }
                    WriterMessage::Shutdown => break,
                }
            }
        });

        (
            Self {
                sender: sender.clone(),
            },
            AuditDrain { sender, writer },
        )
    }

    /// Enqueues one audit event. Never blocks, never fails the caller.
    pub fn record(&self, event: AuditEvent) {
        if self.sender.send(WriterMessage::Event(event)).is_err() {
            warn!("audit writer is stopped; entry dropped");
        }
    }
}

impl AuditDrain {
    /// Flushes all previously accepted events and stops the writer.
    ///
    /// Events recorded before this call are persisted in order; the channel
    /// guarantees the shutdown marker is seen only after them.
    pub async fn drain(self) {
        let _ = self.sender.send(WriterMessage::Shutdown);
        if self.writer.await.is_err() {
            error!("audit writer task panicked during drain");
        }
    }
}

/// Application service for reading the audit trail.
#[derive(Clone)]
pub struct AuditLogService {
    authorization: AuthorizationService,
    audit_log_repository: Arc<dyn AuditLogRepository>,
    denied_attempt_repository: Arc<dyn DeniedAttemptRepository>,
}

impl AuditLogService {
    /// Creates the audit read service.
    #[must_use]
    pub fn new(
        authorization: AuthorizationService,
        audit_log_repository: Arc<dyn AuditLogRepository>,
        denied_attempt_repository: Arc<dyn DeniedAttemptRepository>,
    ) -> Self {
        Self {
            authorization,
            audit_log_repository,
            denied_attempt_repository,
        }
    }

    /// Lists recent audit entries for holders of `audit_log.read`.
    pub async fn list_audit_log(
        &self,
        actor: &AuthenticatedUser,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.authorization
            .authorize(actor, Resource::AuditLog, Action::Read, None)
            .await?;

        self.audit_log_repository.list_recent_entries(query).await
    }

    /// Lists recent denied attempts for holders of `audit_log.read`.
    pub async fn list_denied_attempts(
        &self,
        actor: &AuthenticatedUser,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<DeniedAttemptEntry>> {
        self.authorization
            .authorize(actor, Resource::AuditLog, Action::Read, None)
            .await?;

        self.denied_attempt_repository
            .list_recent_attempts(limit, offset)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use obratrack_core::{AppError, AppResult};
    use obratrack_domain::{AuditAction, Resource, UserId};
    use tokio::sync::Mutex;

    use super::{AuditEvent, AuditRecorder, AuditRepository, ClientMeta};

    #[derive(Default)]
    struct FakeAuditRepository {
        events: Mutex<Vec<AuditEvent>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl AuditRepository for FakeAuditRepository {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            if self.fail_writes {
                return Err(AppError::Internal("audit table unavailable".to_owned()));
            }

            self.events.lock().await.push(event);
            Ok(())
        }
    }

    fn sample_event(resource_id: &str) -> AuditEvent {
        AuditEvent {
            user_id: UserId::new(),
            action: AuditAction::TaskProgressAppended,
            resource: Resource::Tasks,
            resource_id: Some(resource_id.to_owned()),
            details: None,
            client: ClientMeta::default(),
        }
    }

    #[tokio::test]
    async fn drain_flushes_recorded_events_in_order() {
        let repository = Arc::new(FakeAuditRepository::default());
        let (recorder, drain) = AuditRecorder::spawn(repository.clone());

        recorder.record(sample_event("task-1"));
        recorder.record(sample_event("task-2"));
        recorder.record(sample_event("task-3"));
        drain.drain().await;

        let events = repository.events.lock().await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].resource_id.as_deref(), Some("task-1"));
        assert_eq!(events[2].resource_id.as_deref(), Some("task-3"));
    }

    #[tokio::test]
    async fn failed_audit_write_does_not_propagate() {
        let repository = Arc::new(FakeAuditRepository {
            events: Mutex::new(Vec::new()),
            fail_writes: true,
        });
        let (recorder, drain) = AuditRecorder::spawn(repository.clone());

        recorder.record(sample_event("task-1"));
        drain.drain().await;

        let events = repository.events.lock().await;
        assert!(events.is_empty());
    }
}
