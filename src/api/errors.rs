use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use validator::ValidationErrors;

use crate::services::errors::DomainError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<String>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    /// Lifecycle rejection carrying the individual reasons.
    Rejected { detail: String, violations: Vec<String> },
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(message) => Self::NotFound(message),
            DomainError::Forbidden(message) => Self::Forbidden(message),
            DomainError::InvalidState(message) | DomainError::InvalidArgument(message) => {
                tracing::debug!(detail = %message, "Business rule rejected request");
                Self::BadRequest(message)
            }
            DomainError::Conflict(message) => Self::Conflict(message),
            DomainError::NotReady(violations) => {
                tracing::debug!(violations = violations.len(), "Exam not ready");
                Self::Rejected { detail: "exam is not ready to open".to_string(), violations }
            }
            err @ DomainError::UngradedAnswers(_) => Self::BadRequest(err.to_string()),
            DomainError::Storage(err) => Self::internal(err, "Storage operation failed"),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail, violations) = match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response =
                    (status, Json(error_body(status, message.to_string(), Vec::new())))
                        .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                return response;
            }
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message.to_string(), Vec::new()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, Vec::new()),
            ApiError::Rejected { detail, violations } => {
                (StatusCode::BAD_REQUEST, detail, violations)
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message, Vec::new()),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message, Vec::new()),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message, Vec::new())
            }
        };

        (status, Json(error_body(status, detail, violations))).into_response()
    }
}

fn error_body(status: StatusCode, detail: String, violations: Vec<String>) -> ErrorResponse {
    ErrorResponse { status: status.as_u16(), detail, violations }
}
