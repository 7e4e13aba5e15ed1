//! Task aggregate ports shared by the task and progress services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use obratrack_core::AppResult;
use obratrack_domain::{
    Discipline, EquipmentId, Progress, Sector, TaskId, TaskStatus, UserId,
};
use uuid::Uuid;

/// Task row joined with its owning equipment's sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Unique task identifier.
    pub id: TaskId,
    /// Owning equipment.
    pub equipment_id: EquipmentId,
    /// Short task name.
    pub name: String,
    /// Engineering discipline.
    pub discipline: Discipline,
    /// Cached latest completion percentage.
    pub current_progress: Progress,
    /// Planned completion percentage.
    pub target_progress: Progress,
    /// Cached status derived from the latest progress write.
    pub status: TaskStatus,
    /// Whether the task was created ad hoc rather than from a template.
    pub is_custom: bool,
    /// Sector inherited from the owning equipment.
    pub sector: Sector,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the latest mutation.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task on a piece of equipment.
#[derive(Debug, Clone)]
pub struct NewTaskRecord {
    /// Owning equipment.
    pub equipment_id: EquipmentId,
    /// Short task name.
    pub name: String,
    /// Engineering discipline.
    pub discipline: Discipline,
    /// Planned completion percentage.
    pub target_progress: Progress,
    /// Whether the task is ad hoc rather than template-derived.
    pub is_custom: bool,
}

/// Metadata for one uploaded photo; byte storage is external.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    /// Original file name.
    pub file_name: String,
    /// Size in bytes as reported by the upload middleware.
    pub size_bytes: i64,
    /// MIME type as reported by the upload middleware.
    pub mime_type: String,
    /// Path or key in the external blob store.
    pub storage_path: String,
}

/// Persisted photo metadata row attached to a history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    /// Stable photo row id.
    pub id: Uuid,
    /// Original file name.
    pub file_name: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Path or key in the external blob store.
    pub storage_path: String,
    /// User who uploaded the photo.
    pub uploaded_by: UserId,
}

/// Immutable record of one progress transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHistoryRecord {
    /// Stable history entry id.
    pub id: Uuid,
    /// Task the entry belongs to.
    pub task_id: TaskId,
    /// Actor who recorded the transition.
    pub user_id: UserId,
    /// Progress before this entry; `None` for the first entry of a task.
    pub previous_progress: Option<Progress>,
    /// Progress recorded by this entry.
    pub new_progress: Progress,
    /// Status before this entry; `None` for the first entry of a task.
    pub previous_status: Option<TaskStatus>,
    /// Status derived from the recorded progress.
    pub new_status: TaskStatus,
    /// Free-form field observations.
    pub observations: Option<String>,
    /// Ordered photo metadata attached to the entry.
    pub photos: Vec<PhotoRecord>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Input for the transactional progress append.
#[derive(Debug, Clone)]
pub struct AppendProgressInput {
    /// Task being updated.
    pub task_id: TaskId,
    /// Actor recording the transition.
    pub user_id: UserId,
    /// Validated new completion percentage.
    pub new_progress: Progress,
    /// Status derived from `new_progress`.
    pub new_status: TaskStatus,
    /// Free-form field observations.
    pub observations: Option<String>,
    /// Photo metadata to attach to the entry.
    pub photos: Vec<PhotoUpload>,
}

/// Repository port for the task aggregate.
///
/// `append_progress` is the one multi-statement transition: implementations
/// must read the task's current progress/status, insert the history entry
/// (with photo rows) and update the task's cached projection in a single
/// transaction, serialized against concurrent appends to the same task.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Finds one task with its equipment sector.
    async fn find_task(&self, task_id: TaskId) -> AppResult<Option<TaskRecord>>;

    /// Lists tasks of one piece of equipment.
    async fn list_tasks_for_equipment(
        &self,
        equipment_id: EquipmentId,
    ) -> AppResult<Vec<TaskRecord>>;

    /// Creates a task at zero progress with pending status.
    async fn create_task(&self, task: NewTaskRecord) -> AppResult<TaskRecord>;

    /// Deletes a task row. Callers enforce the deletion guard first.
    async fn delete_task(&self, task_id: TaskId) -> AppResult<()>;

    /// Returns whether any history entry exists for the task.
    async fn has_history(&self, task_id: TaskId) -> AppResult<bool>;

    /// Appends a progress transition and updates the task projection
    /// atomically. Returns the persisted history entry.
    async fn append_progress(&self, input: AppendProgressInput) -> AppResult<TaskHistoryRecord>;

    /// Lists history entries of a task, oldest first, photos included.
    async fn list_history(&self, task_id: TaskId) -> AppResult<Vec<TaskHistoryRecord>>;

    /// Finds one history entry with its photos.
    async fn find_history_entry(&self, entry_id: Uuid) -> AppResult<Option<TaskHistoryRecord>>;

    /// Deletes a history entry and its photo rows in one transaction.
    /// The photo cascade is explicit so the blob-store bookkeeping stays
    /// consistent with the database.
    async fn delete_history_entry(&self, entry_id: Uuid) -> AppResult<()>;
}
