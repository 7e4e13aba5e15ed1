use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use obratrack_application::CreateEquipmentParams;
use obratrack_domain::{AreaId, AuthenticatedUser, Discipline, EquipmentId, Sector};
use uuid::Uuid;

use crate::dto::site::{CreateEquipmentRequest, EquipmentResponse};
use crate::error::ApiResult;
use crate::middleware::client_meta;
use crate::state::AppState;

pub async fn create_equipment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(area_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<CreateEquipmentRequest>,
) -> ApiResult<Json<EquipmentResponse>> {
    let discipline = Discipline::from_str(payload.discipline.as_str())?;
    let sector = Sector::parse(payload.sector.as_str())?;

    let equipment = state
        .site_service
        .create_equipment(
            &user,
            CreateEquipmentParams {
                area_id: AreaId::from_uuid(area_id),
                tag: payload.tag,
                discipline,
                sector,
                client: client_meta(&headers),
            },
        )
        .await?;

    Ok(Json(EquipmentResponse::from(equipment)))
}

pub async fn list_equipment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(area_id): Path<Uuid>,
) -> ApiResult<Json<Vec<EquipmentResponse>>> {
    let equipment = state
        .site_service
        .list_equipment(&user, AreaId::from_uuid(area_id))
        .await?
        .into_iter()
        .map(EquipmentResponse::from)
        .collect();

    Ok(Json(equipment))
}

pub async fn get_equipment_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(equipment_id): Path<Uuid>,
) -> ApiResult<Json<EquipmentResponse>> {
    let equipment = state
        .site_service
        .get_equipment(&user, EquipmentId::from_uuid(equipment_id))
        .await?;

    Ok(Json(EquipmentResponse::from(equipment)))
}
