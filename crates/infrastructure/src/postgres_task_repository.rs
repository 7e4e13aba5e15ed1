//! PostgreSQL task repository.
//!
//! `append_progress` is the one multi-statement transition in the system:
//! the task row is locked for the duration of the transaction so concurrent
//! appends to the same task serialize and every history entry captures a
//! consistent previous-progress snapshot.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use obratrack_application::{
    AppendProgressInput, NewTaskRecord, PhotoRecord, TaskHistoryRecord, TaskRecord, TaskRepository,
};
use obratrack_core::{AppError, AppResult};
use obratrack_domain::{
    Discipline, EquipmentId, Progress, Sector, TaskId, TaskStatus, UserId,
};
use uuid::Uuid;

/// PostgreSQL-backed repository for tasks, history entries and photo rows.
#[derive(Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    equipment_id: Uuid,
    name: String,
    discipline: String,
    current_progress: i32,
    target_progress: i32,
    status: String,
    is_custom: bool,
    sector: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for TaskRecord {
    type Error = AppError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let decode_error = |field: &str, error: AppError| {
            AppError::Internal(format!(
                "failed to decode {field} for task '{}': {error}",
                row.id
            ))
        };

        let discipline = Discipline::from_str(row.discipline.as_str())
            .map_err(|error| decode_error("discipline", error))?;
        let current_progress =
            Progress::new(row.current_progress).map_err(|error| decode_error("progress", error))?;
        let target_progress = Progress::new(row.target_progress)
            .map_err(|error| decode_error("target progress", error))?;
        let status = TaskStatus::from_str(row.status.as_str())
            .map_err(|error| decode_error("status", error))?;
        let sector =
            Sector::parse(row.sector.as_str()).map_err(|error| decode_error("sector", error))?;

        Ok(Self {
            id: TaskId::from_uuid(row.id),
            equipment_id: EquipmentId::from_uuid(row.equipment_id),
            name: row.name,
            discipline,
            current_progress,
            target_progress,
            status,
            is_custom: row.is_custom,
            sector,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    task_id: Uuid,
    user_id: Uuid,
    previous_progress: Option<i32>,
    new_progress: i32,
    previous_status: Option<String>,
    new_status: String,
    observations: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct PhotoRow {
    id: Uuid,
    history_entry_id: Uuid,
    file_name: String,
    size_bytes: i64,
    mime_type: String,
    storage_path: String,
    uploaded_by: Uuid,
}

impl From<PhotoRow> for PhotoRecord {
    fn from(row: PhotoRow) -> Self {
        Self {
            id: row.id,
            file_name: row.file_name,
            size_bytes: row.size_bytes,
            mime_type: row.mime_type,
            storage_path: row.storage_path,
            uploaded_by: UserId::from_uuid(row.uploaded_by),
        }
    }
}

fn history_record(row: HistoryRow, photos: Vec<PhotoRecord>) -> AppResult<TaskHistoryRecord> {
    let decode_error = |field: &str, error: AppError| {
        AppError::Internal(format!(
            "failed to decode {field} for history entry '{}': {error}",
            row.id
        ))
    };

    let previous_progress = row
        .previous_progress
        .map(Progress::new)
        .transpose()
        .map_err(|error| decode_error("previous progress", error))?;
    let new_progress =
        Progress::new(row.new_progress).map_err(|error| decode_error("progress", error))?;
    let previous_status = row
        .previous_status
        .as_deref()
        .map(TaskStatus::from_str)
        .transpose()
        .map_err(|error| decode_error("previous status", error))?;
    let new_status = TaskStatus::from_str(row.new_status.as_str())
        .map_err(|error| decode_error("status", error))?;

    Ok(TaskHistoryRecord {
        id: row.id,
        task_id: TaskId::from_uuid(row.task_id),
        user_id: UserId::from_uuid(row.user_id),
        previous_progress,
        new_progress,
        previous_status,
        new_status,
        observations: row.observations,
        photos,
        created_at: row.created_at,
    })
}

const TASK_SELECT: &str = r#"
    SELECT tasks.id, tasks.equipment_id, tasks.name, tasks.discipline,
           tasks.current_progress, tasks.target_progress, tasks.status,
           tasks.is_custom, equipment.sector, tasks.created_at, tasks.updated_at
    FROM tasks
    INNER JOIN equipment ON equipment.id = tasks.equipment_id
"#;

async fn insert_photos(
    transaction: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
    user_id: UserId,
    photos: &[obratrack_application::PhotoUpload],
) -> AppResult<Vec<PhotoRecord>> {
    let mut records = Vec::with_capacity(photos.len());

    for photo in photos {
        let row = sqlx::query_as::<_, PhotoRow>(
            r#"
            INSERT INTO task_photos (history_entry_id, file_name, size_bytes, mime_type, storage_path, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, history_entry_id, file_name, size_bytes, mime_type, storage_path, uploaded_by
            "#,
        )
        .bind(entry_id)
        .bind(&photo.file_name)
        .bind(photo.size_bytes)
        .bind(&photo.mime_type)
        .bind(&photo.storage_path)
        .bind(user_id.as_uuid())
        .fetch_one(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to store photo metadata: {error}"))
        })?;

        records.push(PhotoRecord::from(row));
    }

    Ok(records)
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn find_task(&self, task_id: TaskId) -> AppResult<Option<TaskRecord>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("{TASK_SELECT} WHERE tasks.id = $1"))
            .bind(task_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to find task: {error}")))?;

        row.map(TaskRecord::try_from).transpose()
    }

    async fn list_tasks_for_equipment(
        &self,
        equipment_id: EquipmentId,
    ) -> AppResult<Vec<TaskRecord>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "{TASK_SELECT} WHERE tasks.equipment_id = $1 ORDER BY tasks.created_at ASC"
        ))
        .bind(equipment_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list tasks: {error}")))?;

        rows.into_iter().map(TaskRecord::try_from).collect()
    }

    async fn create_task(&self, task: NewTaskRecord) -> AppResult<TaskRecord> {
        let id = TaskId::new();

        sqlx::query(
            r#"
            INSERT INTO tasks (id, equipment_id, name, discipline, current_progress,
                               target_progress, status, is_custom)
            VALUES ($1, $2, $3, $4, 0, $5, $6, $7)
            "#,
        )
        .bind(id.as_uuid())
        .bind(task.equipment_id.as_uuid())
        .bind(&task.name)
        .bind(task.discipline.as_str())
        .bind(i32::from(task.target_progress.percent()))
        .bind(TaskStatus::Pending.as_str())
        .bind(task.is_custom)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create task: {error}")))?;

        self.find_task(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("task '{id}' missing after insert")))
    }

    async fn delete_task(&self, task_id: TaskId) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(task_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete task: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "task '{task_id}' does not exist"
            )));
        }

        Ok(())
    }

    async fn has_history(&self, task_id: TaskId) -> AppResult<bool> {
        let row = sqlx::query_as::<_, (bool,)>(
            r#"
            SELECT EXISTS(SELECT 1 FROM task_history WHERE task_id = $1)
            "#,
        )
        .bind(task_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to check task history: {error}")))?;

        Ok(row.0)
    }

    async fn append_progress(&self, input: AppendProgressInput) -> AppResult<TaskHistoryRecord> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start progress append transaction for task '{}': {error}",
                input.task_id
            ))
        })?;

        // Row lock on the task serializes concurrent appends; the previous
        // progress read below cannot be torn.
        let task = sqlx::query_as::<_, TaskRow>(&format!(
            "{TASK_SELECT} WHERE tasks.id = $1 FOR UPDATE OF tasks"
        ))
        .bind(input.task_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to lock task '{}' for progress append: {error}",
                input.task_id
            ))
        })?
        .ok_or_else(|| AppError::NotFound(format!("task '{}' does not exist", input.task_id)))?;

        let has_history = sqlx::query_as::<_, (bool,)>(
            r#"
            SELECT EXISTS(SELECT 1 FROM task_history WHERE task_id = $1)
            "#,
        )
        .bind(input.task_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to check history for task '{}': {error}",
                input.task_id
            ))
        })?
        .0;

        let (previous_progress, previous_status) = if has_history {
            (Some(task.current_progress), Some(task.status.clone()))
        } else {
            (None, None)
        };

        let entry = sqlx::query_as::<_, HistoryRow>(
            r#"
            INSERT INTO task_history (task_id, user_id, previous_progress, new_progress,
                                      previous_status, new_status, observations)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, task_id, user_id, previous_progress, new_progress,
                      previous_status, new_status, observations, created_at
            "#,
        )
        .bind(input.task_id.as_uuid())
        .bind(input.user_id.as_uuid())
        .bind(previous_progress)
        .bind(i32::from(input.new_progress.percent()))
        .bind(previous_status)
        .bind(input.new_status.as_str())
        .bind(&input.observations)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append history for task '{}': {error}",
                input.task_id
            ))
        })?;

        let photos =
            insert_photos(&mut transaction, entry.id, input.user_id, &input.photos).await?;

        sqlx::query(
            r#"
            UPDATE tasks
            SET current_progress = $2,
                status = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(input.task_id.as_uuid())
        .bind(i32::from(input.new_progress.percent()))
        .bind(input.new_status.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update task projection for task '{}': {error}",
                input.task_id
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit progress append transaction for task '{}': {error}",
                input.task_id
            ))
        })?;

        history_record(entry, photos)
    }

    async fn list_history(&self, task_id: TaskId) -> AppResult<Vec<TaskHistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, task_id, user_id, previous_progress, new_progress,
                   previous_status, new_status, observations, created_at
            FROM task_history
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list task history: {error}")))?;

        let photo_rows = sqlx::query_as::<_, PhotoRow>(
            r#"
            SELECT photos.id, photos.history_entry_id, photos.file_name, photos.size_bytes,
                   photos.mime_type, photos.storage_path, photos.uploaded_by
            FROM task_photos AS photos
            INNER JOIN task_history ON task_history.id = photos.history_entry_id
            WHERE task_history.task_id = $1
            ORDER BY photos.id ASC
            "#,
        )
        .bind(task_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list history photos: {error}")))?;

        let mut photos_by_entry: HashMap<Uuid, Vec<PhotoRecord>> = HashMap::new();
        for photo in photo_rows {
            photos_by_entry
                .entry(photo.history_entry_id)
                .or_default()
                .push(PhotoRecord::from(photo));
        }

        rows.into_iter()
            .map(|row| {
                let photos = photos_by_entry.remove(&row.id).unwrap_or_default();
                history_record(row, photos)
            })
            .collect()
    }

    async fn find_history_entry(&self, entry_id: Uuid) -> AppResult<Option<TaskHistoryRecord>> {
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, task_id, user_id, previous_progress, new_progress,
                   previous_status, new_status, observations, created_at
            FROM task_history
            WHERE id = $1
            LIMIT 1
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find history entry: {error}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let photo_rows = sqlx::query_as::<_, PhotoRow>(
            r#"
            SELECT id, history_entry_id, file_name, size_bytes, mime_type, storage_path, uploaded_by
            FROM task_photos
            WHERE history_entry_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load entry photos: {error}")))?;

        let photos = photo_rows.into_iter().map(PhotoRecord::from).collect();
        history_record(row, photos).map(Some)
    }

    async fn delete_history_entry(&self, entry_id: Uuid) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start history delete transaction for entry '{entry_id}': {error}"
            ))
        })?;

        // Photo rows are removed explicitly, not by database cascade, so the
        // blob-store bookkeeping stays in step with the database.
        sqlx::query(
            r#"
            DELETE FROM task_photos
            WHERE history_entry_id = $1
            "#,
        )
        .bind(entry_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete photos for history entry '{entry_id}': {error}"
            ))
        })?;

        let result = sqlx::query(
            r#"
            DELETE FROM task_history
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete history entry '{entry_id}': {error}"
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "history entry '{entry_id}' does not exist"
            )));
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit history delete transaction for entry '{entry_id}': {error}"
            ))
        })?;

        Ok(())
    }
}
