//! Shared in-memory fakes for application service tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use obratrack_core::{AppError, AppResult};
use obratrack_domain::{EquipmentId, Progress, Sector, TaskId, TaskStatus};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::audit_service::{
    AuditEvent, AuditRepository, DeniedAttempt, DeniedAttemptEntry, DeniedAttemptRepository,
};
use crate::task_ports::{
    AppendProgressInput, NewTaskRecord, PhotoRecord, TaskHistoryRecord, TaskRecord, TaskRepository,
};

/// Collects audit events in memory.
#[derive(Default)]
pub(crate) struct InMemoryAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Collects denied attempts in memory.
#[derive(Default)]
pub(crate) struct InMemoryDeniedAttemptRepository {
    pub(crate) attempts: Mutex<Vec<DeniedAttempt>>,
}

#[async_trait]
impl DeniedAttemptRepository for InMemoryDeniedAttemptRepository {
    async fn append_attempt(&self, attempt: DeniedAttempt) -> AppResult<()> {
        self.attempts.lock().await.push(attempt);
        Ok(())
    }

    async fn list_recent_attempts(
        &self,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<DeniedAttemptEntry>> {
        let attempts = self.attempts.lock().await;
        Ok(attempts
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .enumerate()
            .map(|(index, attempt)| DeniedAttemptEntry {
                entry_id: index.to_string(),
                user_id: attempt.user_id,
                resource: attempt.resource.as_str().to_owned(),
                action: attempt.action.as_str().to_owned(),
                reason: attempt.reason.as_str().to_owned(),
                detail: attempt.detail.clone(),
                created_at: Utc::now().to_rfc3339(),
            })
            .collect())
    }
}

#[derive(Default)]
struct TaskState {
    tasks: HashMap<TaskId, TaskRecord>,
    history: Vec<TaskHistoryRecord>,
}

/// In-memory task store whose single lock serializes progress appends the
/// way the SQL row lock does.
#[derive(Default)]
pub(crate) struct InMemoryTaskStore {
    state: Mutex<TaskState>,
    /// Sector assigned to tasks created through this store.
    pub(crate) sector: Option<Sector>,
}

#[async_trait]
impl TaskRepository for InMemoryTaskStore {
    async fn find_task(&self, task_id: TaskId) -> AppResult<Option<TaskRecord>> {
        Ok(self.state.lock().await.tasks.get(&task_id).cloned())
    }

    async fn list_tasks_for_equipment(
        &self,
        equipment_id: EquipmentId,
    ) -> AppResult<Vec<TaskRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .tasks
            .values()
            .filter(|task| task.equipment_id == equipment_id)
            .cloned()
            .collect())
    }

    async fn create_task(&self, task: NewTaskRecord) -> AppResult<TaskRecord> {
        let now = Utc::now();
        let record = TaskRecord {
            id: TaskId::new(),
            equipment_id: task.equipment_id,
            name: task.name,
            discipline: task.discipline,
            current_progress: Progress::ZERO,
            target_progress: task.target_progress,
            status: TaskStatus::Pending,
            is_custom: task.is_custom,
            sector: self
                .sector
                .clone()
                .unwrap_or(Sector::Named("electrical".to_owned())),
            created_at: now,
            updated_at: now,
        };

        self.state
            .lock()
            .await
            .tasks
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete_task(&self, task_id: TaskId) -> AppResult<()> {
        self.state.lock().await.tasks.remove(&task_id);
        Ok(())
    }

    async fn has_history(&self, task_id: TaskId) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .history
            .iter()
            .any(|entry| entry.task_id == task_id))
    }

    async fn append_progress(&self, input: AppendProgressInput) -> AppResult<TaskHistoryRecord> {
        let mut state = self.state.lock().await;

        let task = state
            .tasks
            .get(&input.task_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("task '{}'", input.task_id)))?;

        let has_history = state
            .history
            .iter()
            .any(|entry| entry.task_id == input.task_id);
        let (previous_progress, previous_status) = if has_history {
            (Some(task.current_progress), Some(task.status))
        } else {
            (None, None)
        };

        let entry = TaskHistoryRecord {
            id: Uuid::new_v4(),
            task_id: input.task_id,
            user_id: input.user_id,
            previous_progress,
            new_progress: input.new_progress,
            previous_status,
            new_status: input.new_status,
            observations: input.observations,
            photos: input
                .photos
                .into_iter()
                .map(|photo| PhotoRecord {
                    id: Uuid::new_v4(),
                    file_name: photo.file_name,
                    size_bytes: photo.size_bytes,
                    mime_type: photo.mime_type,
                    storage_path: photo.storage_path,
                    uploaded_by: input.user_id,
                })
                .collect(),
            created_at: Utc::now(),
        };

        state.history.push(entry.clone());

        if let Some(task) = state.tasks.get_mut(&input.task_id) {
            task.current_progress = input.new_progress;
            task.status = input.new_status;
            task.updated_at = entry.created_at;
        }

        Ok(entry)
    }

    async fn list_history(&self, task_id: TaskId) -> AppResult<Vec<TaskHistoryRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .history
            .iter()
            .filter(|entry| entry.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn find_history_entry(&self, entry_id: Uuid) -> AppResult<Option<TaskHistoryRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .history
            .iter()
            .find(|entry| entry.id == entry_id)
            .cloned())
    }

    async fn delete_history_entry(&self, entry_id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.history.retain(|entry| entry.id != entry_id);
        Ok(())
    }
}
