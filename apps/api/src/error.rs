use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use obratrack_core::AppError;
use serde::Serialize;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Credential failures collapse into one generic unauthorized reply;
        // the distinct cause is only in the server logs.
        if self.0.is_credential_failure() {
            let payload = Json(ErrorResponse {
                message: "unauthorized".to_owned(),
            });
            return (StatusCode::UNAUTHORIZED, payload).into_response();
        }

        let status = match self.0 {
            AppError::Validation(_) | AppError::InvalidProgress(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::NonDeletableResource(_) => StatusCode::CONFLICT,
            AppError::SectorMismatch(_) | AppError::NoPermission(_) => StatusCode::FORBIDDEN,
            AppError::MissingCredential
            | AppError::InvalidCredential
            | AppError::UnknownOrInactiveSubject => StatusCode::UNAUTHORIZED,
            AppError::AuditWriteFailed(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let payload = Json(ErrorResponse {
            message: self.0.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
