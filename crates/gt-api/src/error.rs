//! HTTP error mapping.
//!
//! `AppError` lives in gt-core and knows nothing about HTTP; this newtype
//! gives it a status code and a JSON body at the API boundary.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use gt_core::error::AppError;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) | AppError::InvalidCoordinate(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if matches!(self.0, AppError::Unavailable(_) | AppError::Internal(_)) {
            log::error!("request failed: {}", self.0);
        }
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "detail": self.0.to_string() }))
    }
}

/// Collaborator failures propagate unchanged; no local recovery, no
/// partial responses.
pub(crate) fn unavailable(err: anyhow::Error) -> AppError {
    AppError::Unavailable(err.to_string())
}
