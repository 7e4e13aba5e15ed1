use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use obratrack_application::CreateProjectParams;
use obratrack_domain::{AuthenticatedUser, ProjectId};
use uuid::Uuid;

use crate::dto::site::{
    AreaResponse, CreateAreaRequest, CreateProjectRequest, ProjectResponse, UpdateProjectRequest,
};
use crate::error::ApiResult;
use crate::middleware::client_meta;
use crate::state::AppState;

pub async fn create_project_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    Json(payload): Json<CreateProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    let project = state
        .site_service
        .create_project(
            &user,
            CreateProjectParams {
                name: payload.name,
                description: payload.description,
                client: client_meta(&headers),
            },
        )
        .await?;

    Ok(Json(ProjectResponse::from(project)))
}

pub async fn list_projects_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<ProjectResponse>>> {
    let projects = state
        .site_service
        .list_projects(&user)
        .await?
        .into_iter()
        .map(ProjectResponse::from)
        .collect();

    Ok(Json(projects))
}

pub async fn update_project_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    let project = state
        .site_service
        .update_project(
            &user,
            ProjectId::from_uuid(project_id),
            payload.name,
            payload.description,
            payload.active,
            client_meta(&headers),
        )
        .await?;

    Ok(Json(ProjectResponse::from(project)))
}

pub async fn create_area_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<CreateAreaRequest>,
) -> ApiResult<Json<AreaResponse>> {
    let area = state
        .site_service
        .create_area(
            &user,
            ProjectId::from_uuid(project_id),
            payload.name,
            client_meta(&headers),
        )
        .await?;

    Ok(Json(AreaResponse::from(area)))
}

pub async fn list_areas_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<AreaResponse>>> {
    let areas = state
        .site_service
        .list_areas(&user, ProjectId::from_uuid(project_id))
        .await?
        .into_iter()
        .map(AreaResponse::from)
        .collect();

    Ok(Json(areas))
}
