use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use obratrack_application::{AppendProgressParams, CreateTaskParams};
use obratrack_domain::{AuthenticatedUser, Discipline, EquipmentId, TaskId};
use uuid::Uuid;

use crate::dto::tasks::{
    AppendProgressRequest, CreateTaskRequest, HistoryEntryResponse, TaskResponse,
};
use crate::error::ApiResult;
use crate::middleware::client_meta;
use crate::state::AppState;

pub async fn create_task_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(equipment_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<CreateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let discipline = Discipline::from_str(payload.discipline.as_str())?;

    let task = state
        .task_service
        .create_task(
            &user,
            CreateTaskParams {
                equipment_id: EquipmentId::from_uuid(equipment_id),
                name: payload.name,
                discipline,
                target_progress: payload.target_progress,
                client: client_meta(&headers),
            },
        )
        .await?;

    Ok(Json(TaskResponse::from(task)))
}

pub async fn list_tasks_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(equipment_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = state
        .task_service
        .list_tasks(&user, EquipmentId::from_uuid(equipment_id))
        .await?
        .into_iter()
        .map(TaskResponse::from)
        .collect();

    Ok(Json(tasks))
}

pub async fn get_task_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .task_service
        .get_task(&user, TaskId::from_uuid(task_id))
        .await?;

    Ok(Json(TaskResponse::from(task)))
}

pub async fn delete_task_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .task_service
        .delete_task(&user, TaskId::from_uuid(task_id), client_meta(&headers))
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn append_progress_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<AppendProgressRequest>,
) -> ApiResult<Json<HistoryEntryResponse>> {
    let entry = state
        .progress_service
        .append_progress(
            &user,
            AppendProgressParams {
                task_id: TaskId::from_uuid(task_id),
                new_progress: payload.new_progress,
                observations: payload.observations,
                photos: payload.photos.into_iter().map(Into::into).collect(),
                client: client_meta(&headers),
            },
        )
        .await?;

    Ok(Json(HistoryEntryResponse::from(entry)))
}

pub async fn list_history_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<HistoryEntryResponse>>> {
    let entries = state
        .progress_service
        .list_history(&user, TaskId::from_uuid(task_id))
        .await?
        .into_iter()
        .map(HistoryEntryResponse::from)
        .collect();

    Ok(Json(entries))
}

pub async fn delete_history_entry_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(entry_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .progress_service
        .delete_history_entry(&user, entry_id, client_meta(&headers))
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}
