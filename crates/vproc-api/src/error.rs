//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vproc_models::ValidationError;
use vproc_worker::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Detail served in place of internal errors in production.
pub const INTERNAL_ERROR_DETAIL: &str = "An internal error occurred";

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse { detail: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vproc_worker::PipelineStage;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(ValidationError::MissingData).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PipelineError::conflict("abc-123")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PipelineError::download_failed("gone")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(PipelineError::filesystem(PipelineStage::CleaningUp, "busy"))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_detail_is_message() {
        let err = ApiError::from(ValidationError::MissingName);
        assert_eq!(err.to_string(), "Bad Request: missing filename.");
    }
}
