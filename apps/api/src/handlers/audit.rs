use axum::extract::{Query, State};
use axum::{Extension, Json};
use obratrack_core::AppError;
use obratrack_domain::{AuthenticatedUser, UserId};
use uuid::Uuid;

use crate::dto::audit::{AuditLogEntryResponse, DeniedAttemptResponse};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, serde::Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub action: Option<String>,
    pub user_id: Option<String>,
}

pub async fn list_audit_log_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<Json<Vec<AuditLogEntryResponse>>> {
    let user_filter = query
        .user_id
        .map(|value| {
            Uuid::parse_str(value.as_str())
                .map(UserId::from_uuid)
                .map_err(|error| AppError::Validation(format!("invalid user id filter: {error}")))
        })
        .transpose()?;

    let entries = state
        .audit_log_service
        .list_audit_log(
            &user,
            obratrack_application::AuditLogQuery {
                limit: query.limit.unwrap_or(50),
                offset: query.offset.unwrap_or(0),
                action: query.action,
                user_id: user_filter,
            },
        )
        .await?
        .into_iter()
        .map(AuditLogEntryResponse::from)
        .collect();

    Ok(Json(entries))
}

#[derive(Debug, serde::Deserialize)]
pub struct DeniedAttemptQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list_denied_attempts_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<DeniedAttemptQuery>,
) -> ApiResult<Json<Vec<DeniedAttemptResponse>>> {
    let attempts = state
        .audit_log_service
        .list_denied_attempts(&user, query.limit.unwrap_or(50), query.offset.unwrap_or(0))
        .await?
        .into_iter()
        .map(DeniedAttemptResponse::from)
        .collect();

    Ok(Json(attempts))
}
