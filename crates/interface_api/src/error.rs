//! API error handling

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::{PortError, TemporalError};
use domain_cases::CaseError;
use domain_directory::DirectoryError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        field: Option<String>,
    },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ApiError {
    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            field: None,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string(), None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict { message, field } => {
                (StatusCode::CONFLICT, "conflict", message, field.map(|f| vec![f]))
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg, None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => ApiError::NotFound(format!("{} not found: {}", entity_type, id)),
            PortError::Validation { message, .. } => ApiError::Validation(message),
            PortError::Conflict { message, field } => ApiError::Conflict { message, field },
            PortError::Timeout { operation, duration_ms } => {
                ApiError::ServiceUnavailable(format!("{} timed out after {}ms", operation, duration_ms))
            }
            PortError::ServiceUnavailable { service } => ApiError::ServiceUnavailable(format!("{} unavailable", service)),
            PortError::Connection { message, .. } => {
                error!(error = %message, "Storage connection failure");
                ApiError::ServiceUnavailable("Storage unavailable".to_string())
            }
            PortError::Internal { message, .. } => {
                error!(error = %message, "Storage failure");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<CaseError> for ApiError {
    fn from(err: CaseError) -> Self {
        match err {
            CaseError::Validation(msg) => ApiError::Validation(msg),
            e @ CaseError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            CaseError::Conflict(msg) => ApiError::conflict(msg),
            // Already logged and recorded in the issue log
            CaseError::Integrity(_) => ApiError::NotFound("Associated case not found".to_string()),
            CaseError::Forbidden(msg) => ApiError::Forbidden(msg),
            CaseError::Upstream(e) => e.into(),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation(msg) => ApiError::Validation(msg),
            e @ DirectoryError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            e @ DirectoryError::Duplicate { .. } => ApiError::Conflict {
                message: e.to_string(),
                field: Some("name".to_string()),
            },
            e @ DirectoryError::InUse { .. } => ApiError::conflict(e.to_string()),
            DirectoryError::Store(e) => e.into(),
        }
    }
}

impl From<TemporalError> for ApiError {
    fn from(err: TemporalError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
