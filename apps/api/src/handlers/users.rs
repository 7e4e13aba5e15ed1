use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use obratrack_application::CreateUserParams;
use obratrack_core::AppError;
use obratrack_domain::{AuthenticatedUser, ProjectId, Role, Sector, UserId};
use uuid::Uuid;

use crate::dto::users::{
    CreateUserRequest, SetActiveRequest, UpdateAssignmentRequest, UserResponse,
};
use crate::error::ApiResult;
use crate::middleware::client_meta;
use crate::state::AppState;

fn parse_project_id(value: Option<String>) -> Result<Option<ProjectId>, AppError> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            Uuid::parse_str(value.as_str())
                .map(ProjectId::from_uuid)
                .map_err(|error| AppError::Validation(format!("invalid project id: {error}")))
        })
        .transpose()
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let role = Role::from_str(payload.role.as_str())?;
    let sector = Sector::parse(payload.sector.as_str())?;
    let project_id = parse_project_id(payload.project_id)?;

    let user_id = state
        .user_admin_service
        .create_user(
            &user,
            CreateUserParams {
                name: payload.name,
                email: payload.email,
                password: payload.password,
                role,
                sector,
                project_id,
                client: client_meta(&headers),
            },
        )
        .await?;

    Ok(Json(serde_json::json!({ "id": user_id.to_string() })))
}

pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state
        .user_admin_service
        .list_users(&user)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn set_user_active_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<SetActiveRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .user_admin_service
        .set_active(
            &user,
            UserId::from_uuid(user_id),
            payload.active,
            client_meta(&headers),
        )
        .await?;

    Ok(Json(serde_json::json!({ "active": payload.active })))
}

pub async fn update_user_assignment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<UpdateAssignmentRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let role = Role::from_str(payload.role.as_str())?;
    let sector = Sector::parse(payload.sector.as_str())?;
    let project_id = parse_project_id(payload.project_id)?;

    state
        .user_admin_service
        .update_assignment(
            &user,
            UserId::from_uuid(user_id),
            role,
            sector,
            project_id,
            client_meta(&headers),
        )
        .await?;

    Ok(Json(serde_json::json!({ "updated": true })))
}
