use obratrack_application::{PhotoRecord, PhotoUpload, TaskHistoryRecord, TaskRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub name: String,
    pub discipline: String,
    pub target_progress: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: String,
    pub equipment_id: String,
    pub name: String,
    pub discipline: String,
    pub current_progress: u8,
    pub target_progress: u8,
    pub status: String,
    pub is_custom: bool,
    pub sector: String,
    pub updated_at: String,
}

impl From<TaskRecord> for TaskResponse {
    fn from(value: TaskRecord) -> Self {
        Self {
            id: value.id.to_string(),
            equipment_id: value.equipment_id.to_string(),
            name: value.name,
            discipline: value.discipline.as_str().to_owned(),
            current_progress: value.current_progress.percent(),
            target_progress: value.target_progress.percent(),
            status: value.status.as_str().to_owned(),
            is_custom: value.is_custom,
            sector: value.sector.as_str().to_owned(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploadRequest {
    pub file_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub storage_path: String,
}

impl From<PhotoUploadRequest> for PhotoUpload {
    fn from(value: PhotoUploadRequest) -> Self {
        Self {
            file_name: value.file_name,
            size_bytes: value.size_bytes,
            mime_type: value.mime_type,
            storage_path: value.storage_path,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendProgressRequest {
    pub new_progress: i32,
    pub observations: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoUploadRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub id: String,
    pub file_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub storage_path: String,
    pub uploaded_by: String,
}

impl From<PhotoRecord> for PhotoResponse {
    fn from(value: PhotoRecord) -> Self {
        Self {
            id: value.id.to_string(),
            file_name: value.file_name,
            size_bytes: value.size_bytes,
            mime_type: value.mime_type,
            storage_path: value.storage_path,
            uploaded_by: value.uploaded_by.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub previous_progress: Option<u8>,
    pub new_progress: u8,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub observations: Option<String>,
    pub photos: Vec<PhotoResponse>,
    pub created_at: String,
}

impl From<TaskHistoryRecord> for HistoryEntryResponse {
    fn from(value: TaskHistoryRecord) -> Self {
        Self {
            id: value.id.to_string(),
            task_id: value.task_id.to_string(),
            user_id: value.user_id.to_string(),
            previous_progress: value.previous_progress.map(|progress| progress.percent()),
            new_progress: value.new_progress.percent(),
            previous_status: value
                .previous_status
                .map(|status| status.as_str().to_owned()),
            new_status: value.new_status.as_str().to_owned(),
            observations: value.observations,
            photos: value.photos.into_iter().map(PhotoResponse::from).collect(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}
