use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use obratrack_application::{
    AppendProgressInput, NewTaskRecord, PhotoRecord, TaskHistoryRecord, TaskRecord, TaskRepository,
};
use obratrack_core::{AppError, AppResult};
use obratrack_domain::{EquipmentId, Progress, Sector, TaskId, TaskStatus};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    tasks: HashMap<TaskId, TaskRecord>,
    history: Vec<TaskHistoryRecord>,
}

/// In-memory task repository implementation.
///
/// One mutex guards the whole state: an append holds it across the
/// read-previous / insert-history / update-task sequence, matching the
/// serialization the PostgreSQL implementation gets from its row lock.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    state: Mutex<State>,
    default_sector: Option<Sector>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            default_sector: None,
        }
    }

    /// Creates a repository whose tasks are created in the given sector.
    #[must_use]
    pub fn with_sector(sector: Sector) -> Self {
        Self {
            state: Mutex::new(State::default()),
            default_sector: Some(sector),
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn find_task(&self, task_id: TaskId) -> AppResult<Option<TaskRecord>> {
        Ok(self.state.lock().await.tasks.get(&task_id).cloned())
    }

    async fn list_tasks_for_equipment(
        &self,
        equipment_id: EquipmentId,
    ) -> AppResult<Vec<TaskRecord>> {
        let state = self.state.lock().await;

        let mut tasks: Vec<TaskRecord> = state
            .tasks
            .values()
            .filter(|task| task.equipment_id == equipment_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.created_at);

        Ok(tasks)
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
                .default_sector
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
        let mut state = self.state.lock().await;

        if state.tasks.remove(&task_id).is_none() {
            return Err(AppError::NotFound(format!(
                "task '{task_id}' does not exist"
            )));
        }

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
            .ok_or_else(|| AppError::NotFound(format!("task '{}' does not exist", input.task_id)))?;

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

        let before = state.history.len();
        state.history.retain(|entry| entry.id != entry_id);

        if state.history.len() == before {
            return Err(AppError::NotFound(format!(
                "history entry '{entry_id}' does not exist"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use obratrack_application::{AppendProgressInput, NewTaskRecord, TaskRepository};
    use obratrack_domain::{
        Discipline, EquipmentId, Progress, TaskId, TaskStatus, UserId, derive_status,
    };

    use super::InMemoryTaskRepository;

    async fn create_task(repository: &InMemoryTaskRepository) -> TaskId {
        let task = repository
            .create_task(NewTaskRecord {
                equipment_id: EquipmentId::new(),
                name: "grounding grid".to_owned(),
                discipline: Discipline::Electrical,
                target_progress: Progress::COMPLETE,
                is_custom: true,
            })
            .await;

        match task {
            Ok(task) => task.id,
            Err(_) => panic!("test"),
        }
    }

    fn append_input(task_id: TaskId, percent: i32) -> AppendProgressInput {
        let new_progress = match Progress::new(percent) {
            Ok(value) => value,
            Err(_) => panic!("test"),
        };

        AppendProgressInput {
            task_id,
            user_id: UserId::new(),
            new_progress,
            new_status: derive_status(new_progress),
            observations: None,
            photos: Vec::new(),
        }
    }

    #[tokio::test]
    async fn first_entry_has_no_previous_values() {
        let repository = InMemoryTaskRepository::new();
        let task_id = create_task(&repository).await;

        let entry = repository.append_progress(append_input(task_id, 20)).await;
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => panic!("test"),
        };

        assert_eq!(entry.previous_progress, None);
        assert_eq!(entry.previous_status, None);
        assert_eq!(entry.new_status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn chain_links_previous_to_prior_entry() {
        let repository = InMemoryTaskRepository::new();
        let task_id = create_task(&repository).await;

        let first = repository.append_progress(append_input(task_id, 30)).await;
        assert!(first.is_ok());

        let second = repository.append_progress(append_input(task_id, 55)).await;
        let second = match second {
            Ok(entry) => entry,
            Err(_) => panic!("test"),
        };

        assert_eq!(second.previous_progress.map(|p| p.percent()), Some(30));
        assert_eq!(second.previous_status, Some(TaskStatus::InProgress));

        let task = match repository.find_task(task_id).await {
            Ok(Some(task)) => task,
            _ => panic!("test"),
        };
        assert_eq!(task.current_progress.percent(), 55);
    }

    #[tokio::test]
    async fn concurrent_appends_keep_chain_consistent() {
        let repository = Arc::new(InMemoryTaskRepository::new());
        let task_id = create_task(&repository).await;

        let mut handles = Vec::new();
        for percent in [10, 20, 30, 40, 50] {
            let repository = repository.clone();
            handles.push(tokio::spawn(async move {
                repository.append_progress(append_input(task_id, percent)).await
            }));
        }

        for handle in handles {
            let result = handle.await;
            assert!(matches!(result, Ok(Ok(_))));
        }

        let history = match repository.list_history(task_id).await {
            Ok(entries) => entries,
            Err(_) => panic!("test"),
        };
        assert_eq!(history.len(), 5);

        // Each entry's previous value is the prior entry's new value; the
        // chain has no gaps regardless of scheduling order.
        assert_eq!(history[0].previous_progress, None);
        for pair in history.windows(2) {
            assert_eq!(pair[1].previous_progress, Some(pair[0].new_progress));
            assert_eq!(pair[1].previous_status, Some(pair[0].new_status));
        }

        let task = match repository.find_task(task_id).await {
            Ok(Some(task)) => task,
            _ => panic!("test"),
        };
        let last = match history.last() {
            Some(entry) => entry,
            None => panic!("test"),
        };
        assert_eq!(task.current_progress, last.new_progress);
    }

    #[tokio::test]
    async fn deleting_history_entry_removes_it() {
        let repository = InMemoryTaskRepository::new();
        let task_id = create_task(&repository).await;

        let entry = repository.append_progress(append_input(task_id, 40)).await;
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => panic!("test"),
        };

        let deleted = repository.delete_history_entry(entry.id).await;
        assert!(deleted.is_ok());

        let has_history = repository.has_history(task_id).await;
        assert_eq!(has_history.ok(), Some(false));
    }
}
