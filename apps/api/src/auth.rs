//! Authentication handlers: login, logout, identity echo.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use obratrack_core::AppError;
use obratrack_domain::AuthenticatedUser;

use crate::dto::auth::{IdentityResponse, LoginRequest, LoginResponse};
use crate::error::ApiResult;
use crate::middleware::bearer_token;
use crate::state::AppState;

pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let session = state
        .identity_service
        .login(payload.email.as_str(), payload.password.as_str())
        .await?;

    Ok(Json(LoginResponse {
        token: session.token,
        user: IdentityResponse::from(session.user),
    }))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let bearer = bearer_token(&headers).ok_or(AppError::MissingCredential)?;
    state.identity_service.logout(bearer.as_str()).await?;

    Ok(Json(serde_json::json!({ "loggedOut": true })))
}

pub async fn me_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<IdentityResponse>> {
    Ok(Json(IdentityResponse::from(user)))
}
