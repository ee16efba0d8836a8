//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::orchestrator::OrchestratorError;
use crate::storage::StorageError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// Body for payloads rejected before the pipeline runs.
#[derive(Debug, Serialize)]
pub struct ValidationBody {
    pub status: &'static str,
    pub errors: Vec<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Validation(errors) => {
                let body = ValidationBody {
                    status: "validation_error",
                    errors,
                };
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::ServiceUnavailable(detail) => {
                tracing::warn!(detail = %detail, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "The diagnostic model is not loaded".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::ClassifierUnavailable(reason) => {
                ApiError::ServiceUnavailable(reason)
            }
            e @ OrchestratorError::InvalidRecord(_) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidFileName(_) => ApiError::BadRequest("Invalid filename".into()),
            StorageError::NotFound(name) => ApiError::NotFound(format!("File not found: {name}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
