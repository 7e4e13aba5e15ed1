//! Progress history ledger.
//!
//! Appends are validated here, authorized against the task's sector, and
//! persisted through the transactional repository contract so the task's
//! cached progress/status never diverges from its latest history entry.

use std::sync::Arc;

use obratrack_core::{AppError, AppResult};
use obratrack_domain::{
    Action, AuditAction, AuthenticatedUser, Progress, Resource, TaskId, derive_status,
};
use serde_json::json;
use uuid::Uuid;

use crate::audit_service::{AuditEvent, AuditRecorder, ClientMeta};
use crate::authorization_service::AuthorizationService;
use crate::task_ports::{
    AppendProgressInput, PhotoUpload, TaskHistoryRecord, TaskRecord, TaskRepository,
};

/// Caller parameters for one progress append.
#[derive(Debug, Clone)]
pub struct AppendProgressParams {
    /// Task being updated.
    pub task_id: TaskId,
    /// Raw percentage from the caller; validated here.
    pub new_progress: i32,
    /// Free-form field observations.
    pub observations: Option<String>,
    /// Photo metadata from the upload middleware.
    pub photos: Vec<PhotoUpload>,
    /// Client metadata for the audit trail.
    pub client: ClientMeta,
}

/// Application service for the append-only task progress ledger.
#[derive(Clone)]
pub struct ProgressService {
    tasks: Arc<dyn TaskRepository>,
    authorization: AuthorizationService,
    audit: AuditRecorder,
}

impl ProgressService {
    /// Creates the progress ledger service.
    #[must_use]
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        authorization: AuthorizationService,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            tasks,
            authorization,
            audit,
        }
    }

    /// Appends a progress transition to a task.
    ///
    /// Derives the new status from the percentage and persists history entry
    /// and task projection in one repository transaction. The audit record
    /// is emitted after the transaction commits and never fails the call.
    pub async fn append_progress(
        &self,
        actor: &AuthenticatedUser,
        params: AppendProgressParams,
    ) -> AppResult<TaskHistoryRecord> {
        let task = self.find_task(params.task_id).await?;

        self.authorization
            .authorize(actor, Resource::Tasks, Action::Update, Some(&task.sector))
            .await?;

        let new_progress = Progress::new(params.new_progress)?;
        let new_status = derive_status(new_progress);

        let entry = self
            .tasks
            .append_progress(AppendProgressInput {
                task_id: task.id,
                user_id: actor.id(),
                new_progress,
                new_status,
                observations: params.observations,
                photos: params.photos,
            })
            .await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::TaskProgressAppended,
            resource: Resource::Tasks,
            resource_id: Some(task.id.to_string()),
            details: Some(json!({
                "previous_progress": entry.previous_progress.map(|p| p.percent()),
                "new_progress": entry.new_progress.percent(),
                "previous_status": entry.previous_status.map(|s| s.as_str()),
                "new_status": entry.new_status.as_str(),
                "photo_count": entry.photos.len(),
            })),
            client: params.client,
        });

        Ok(entry)
    }

    /// Lists the history timeline of a task, oldest first.
    pub async fn list_history(
        &self,
        actor: &AuthenticatedUser,
        task_id: TaskId,
    ) -> AppResult<Vec<TaskHistoryRecord>> {
        let task = self.find_task(task_id).await?;

        self.authorization
            .authorize(actor, Resource::Tasks, Action::Read, Some(&task.sector))
            .await?;

        self.tasks.list_history(task_id).await
    }

    /// Deletes one history entry and its photo rows.
    ///
    /// Gated on the dedicated `task_history.delete` capability; the photo
    /// cascade is explicit inside the repository transaction.
    pub async fn delete_history_entry(
        &self,
        actor: &AuthenticatedUser,
        entry_id: Uuid,
        client: ClientMeta,
    ) -> AppResult<()> {
        let entry = self
            .tasks
            .find_history_entry(entry_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("history entry '{entry_id}' does not exist"))
            })?;

        let task = self.find_task(entry.task_id).await?;

        self.authorization
            .authorize(
                actor,
                Resource::TaskHistory,
                Action::Delete,
                Some(&task.sector),
            )
            .await?;

        self.tasks.delete_history_entry(entry_id).await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::TaskHistoryEntryDeleted,
            resource: Resource::TaskHistory,
            resource_id: Some(entry_id.to_string()),
            details: Some(json!({
                "task_id": entry.task_id.to_string(),
                "deleted_progress": entry.new_progress.percent(),
                "deleted_photo_count": entry.photos.len(),
            })),
            client,
        });

        Ok(())
    }

    async fn find_task(&self, task_id: TaskId) -> AppResult<TaskRecord> {
        self.tasks
            .find_task(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task '{task_id}' does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use obratrack_core::AppError;
    use obratrack_domain::{
        Action, AuthenticatedUser, Progress, Resource, Role, Sector, TaskStatus, UserId,
    };

    use crate::audit_service::{AuditRecorder, ClientMeta};
    use crate::authorization_service::AuthorizationService;
    use crate::permission_table::{PermissionGrant, PermissionTable};
    use crate::task_ports::{NewTaskRecord, TaskRepository};
    use crate::test_support::{InMemoryAuditRepository, InMemoryDeniedAttemptRepository, InMemoryTaskStore};

    use super::{AppendProgressParams, ProgressService};

    fn engineer(sector: &str) -> AuthenticatedUser {
        let sector = match Sector::parse(sector) {
            Ok(value) => value,
            Err(_) => panic!("test"),
        };
        AuthenticatedUser::new(UserId::new(), "field engineer", Role::Engineer, sector, None)
    }

    fn grants() -> PermissionTable {
        PermissionTable::from_grants(vec![
            PermissionGrant {
                role: Role::Engineer,
                resource: Resource::Tasks,
                action: Action::Update,
                granted: true,
            },
            PermissionGrant {
                role: Role::Engineer,
                resource: Resource::Tasks,
                action: Action::Read,
                granted: true,
            },
        ])
    }

    fn params(task_id: obratrack_domain::TaskId, new_progress: i32) -> AppendProgressParams {
        AppendProgressParams {
            task_id,
            new_progress,
            observations: None,
            photos: Vec::new(),
            client: ClientMeta::default(),
        }
    }

    async fn setup() -> (ProgressService, Arc<InMemoryTaskStore>, obratrack_domain::TaskId) {
        let store = Arc::new(InMemoryTaskStore::default());
        let task = match store
            .create_task(NewTaskRecord {
                equipment_id: obratrack_domain::EquipmentId::new(),
                name: "cable tray installation".to_owned(),
                discipline: obratrack_domain::Discipline::Electrical,
                target_progress: Progress::COMPLETE,
                is_custom: true,
            })
            .await
        {
            Ok(task) => task,
            Err(_) => panic!("test"),
        };

        let authorization = AuthorizationService::new(
            Arc::new(grants()),
            Arc::new(InMemoryDeniedAttemptRepository::default()),
        );
        let (audit, _drain) = AuditRecorder::spawn(Arc::new(InMemoryAuditRepository::default()));
        let service = ProgressService::new(store.clone(), authorization, audit);

        (service, store, task.id)
    }

    #[tokio::test]
    async fn history_chain_is_gap_free() {
        let (service, store, task_id) = setup().await;
        let actor = engineer("electrical");

        let first = service.append_progress(&actor, params(task_id, 30)).await;
        let second = service.append_progress(&actor, params(task_id, 55)).await;

        let first = match first {
            Ok(entry) => entry,
            Err(_) => panic!("test"),
        };
        let second = match second {
            Ok(entry) => entry,
            Err(_) => panic!("test"),
        };

        assert_eq!(first.previous_progress, None);
        assert_eq!(first.previous_status, None);
        assert_eq!(first.new_status, TaskStatus::InProgress);
        assert_eq!(second.previous_progress.map(|p| p.percent()), Some(30));
        assert_eq!(second.previous_status, Some(TaskStatus::InProgress));

        let task = match store.find_task(task_id).await {
            Ok(Some(task)) => task,
            _ => panic!("test"),
        };
        assert_eq!(task.current_progress.percent(), 55);
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn completion_derives_completed_status() {
        let (service, store, task_id) = setup().await;
        let actor = engineer("electrical");

        let result = service.append_progress(&actor, params(task_id, 100)).await;
        assert!(result.is_ok());

        let task = match store.find_task(task_id).await {
            Ok(Some(task)) => task,
            _ => panic!("test"),
        };
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn out_of_range_progress_is_rejected_before_persistence() {
        let (service, store, task_id) = setup().await;
        let actor = engineer("electrical");

        let result = service.append_progress(&actor, params(task_id, 120)).await;
        assert!(matches!(result, Err(AppError::InvalidProgress(_))));

        let history = match store.list_history(task_id).await {
            Ok(entries) => entries,
            Err(_) => panic!("test"),
        };
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn cross_sector_append_is_denied() {
        let (service, store, task_id) = setup().await;
        let actor = engineer("mechanical");

        let result = service.append_progress(&actor, params(task_id, 30)).await;
        assert!(matches!(result, Err(AppError::SectorMismatch(_))));

        let history = match store.list_history(task_id).await {
            Ok(entries) => entries,
            Err(_) => panic!("test"),
        };
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_serialize_without_lost_updates() {
        let (service, store, task_id) = setup().await;
        let actor = engineer("electrical");

        let first = service.append_progress(&actor, params(task_id, 30));
        let second = service.append_progress(&actor, params(task_id, 55));
        let (first, second) = tokio::join!(first, second);
        assert!(first.is_ok());
        assert!(second.is_ok());

        let history = match store.list_history(task_id).await {
            Ok(entries) => entries,
            Err(_) => panic!("test"),
        };
        assert_eq!(history.len(), 2);

        // Whatever the commit order, each entry's previous value is the
        // other's new value or none; the chain has no torn read.
        assert_eq!(history[0].previous_progress, None);
        assert_eq!(
            history[1].previous_progress,
            Some(history[0].new_progress)
        );

        let task = match store.find_task(task_id).await {
            Ok(Some(task)) => task,
            _ => panic!("test"),
        };
        assert_eq!(task.current_progress, history[1].new_progress);
    }
}
