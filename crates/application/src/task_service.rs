//! Task CRUD service: creation, listing, and guarded deletion.

use std::sync::Arc;

use obratrack_core::{AppError, AppResult, NonEmptyString};
use obratrack_domain::{
    Action, AuditAction, AuthenticatedUser, Discipline, EquipmentId, Progress, Resource, TaskId,
};
use serde_json::json;

use crate::audit_service::{AuditEvent, AuditRecorder, ClientMeta};
use crate::authorization_service::AuthorizationService;
use crate::site_service::SiteRepository;
use crate::task_ports::{NewTaskRecord, TaskRecord, TaskRepository};

/// Caller parameters for task creation.
#[derive(Debug, Clone)]
pub struct CreateTaskParams {
    /// Owning equipment.
    pub equipment_id: EquipmentId,
    /// Short task name.
    pub name: String,
    /// Engineering discipline.
    pub discipline: Discipline,
    /// Raw target percentage from the caller; validated here.
    pub target_progress: i32,
    /// Client metadata for the audit trail.
    pub client: ClientMeta,
}

/// Application service for task lifecycle operations.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    site: Arc<dyn SiteRepository>,
    authorization: AuthorizationService,
    audit: AuditRecorder,
}

impl TaskService {
    /// Creates the task service.
    #[must_use]
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        site: Arc<dyn SiteRepository>,
        authorization: AuthorizationService,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            tasks,
            site,
            authorization,
            audit,
        }
    }

    /// Creates a custom task on a piece of equipment.
    ///
    /// The task inherits the equipment's sector; the creation is authorized
    /// against that sector before anything is persisted.
    pub async fn create_task(
        &self,
        actor: &AuthenticatedUser,
        params: CreateTaskParams,
    ) -> AppResult<TaskRecord> {
        let equipment = self
            .site
            .find_equipment(params.equipment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "equipment '{}' does not exist",
                    params.equipment_id
                ))
            })?;

        self.authorization
            .authorize(actor, Resource::Tasks, Action::Create, Some(&equipment.sector))
            .await?;

        let name = NonEmptyString::new(params.name)?;
        let target_progress = Progress::new(params.target_progress)?;

        let task = self
            .tasks
            .create_task(NewTaskRecord {
                equipment_id: params.equipment_id,
                name: name.as_str().to_owned(),
                discipline: params.discipline,
                target_progress,
                is_custom: true,
            })
            .await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::TaskCreated,
            resource: Resource::Tasks,
            resource_id: Some(task.id.to_string()),
            details: Some(json!({
                "equipment_id": params.equipment_id.to_string(),
                "name": task.name,
                "target_progress": task.target_progress.percent(),
            })),
            client: params.client,
        });

        Ok(task)
    }

    /// Lists tasks of a piece of equipment, enforcing sector-scoped reads.
    pub async fn list_tasks(
        &self,
        actor: &AuthenticatedUser,
        equipment_id: EquipmentId,
    ) -> AppResult<Vec<TaskRecord>> {
        let equipment = self
            .site
            .find_equipment(equipment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("equipment '{equipment_id}' does not exist"))
            })?;

        self.authorization
            .authorize(actor, Resource::Tasks, Action::Read, Some(&equipment.sector))
            .await?;

        self.tasks.list_tasks_for_equipment(equipment_id).await
    }

    /// Returns one task, enforcing sector-scoped reads.
    pub async fn get_task(
        &self,
        actor: &AuthenticatedUser,
        task_id: TaskId,
    ) -> AppResult<TaskRecord> {
        let task = self
            .tasks
            .find_task(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task '{task_id}' does not exist")))?;

        self.authorization
            .authorize(actor, Resource::Tasks, Action::Read, Some(&task.sector))
            .await?;

        Ok(task)
    }

    /// Deletes an untouched task.
    ///
    /// The deletion guard is absolute: any recorded progress or history
    /// entry blocks deletion for every role. Untouched template tasks
    /// require admin; untouched custom tasks also allow supervisors.
    pub async fn delete_task(
        &self,
        actor: &AuthenticatedUser,
        task_id: TaskId,
        client: ClientMeta,
    ) -> AppResult<()> {
        let task = self
            .tasks
            .find_task(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task '{task_id}' does not exist")))?;

        let has_history = self.tasks.has_history(task_id).await?;

        self.authorization
            .authorize_task_delete(
                actor,
                &task.sector,
                task.is_custom,
                task.current_progress,
                has_history,
            )
            .await?;

        self.tasks.delete_task(task_id).await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::TaskDeleted,
            resource: Resource::Tasks,
            resource_id: Some(task_id.to_string()),
            details: Some(json!({
                "name": task.name,
                "is_custom": task.is_custom,
            })),
            client,
        });

        Ok(())
    }
}
