use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::repository::RepositoryError;

/// ApiError
///
/// The error taxonomy every handler answers with. Each variant maps to exactly
/// one status code; the message is what the client sees, so `Internal` only
/// ever carries a fixed, sanitized sentence (see [`ApiError::internal`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// 400: malformed JSON, missing or invalid fields, bad UUIDs, bad pagination.
    #[error("{0}")]
    Validation(String),
    /// 401: missing, invalid or expired token; wrong credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// 403: valid identity, insufficient role.
    #[error("{0}")]
    Forbidden(String),
    /// 404: no matching resource.
    #[error("{0}")]
    NotFound(String),
    /// 500: persistence, hashing or signing failure.
    #[error("{0}")]
    Internal(String),
}

/// Error body returned to clients: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Logs `source` server-side and returns a 500 whose body only contains `message`.
    pub fn internal(message: &str, source: impl Display) -> Self {
        tracing::error!(error = %source, "{message}");
        Self::Internal(message.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::internal("internal server error", err)
    }
}

/// Flattens field errors into one sentence, ordered by field name so the
/// message is stable. Schema-level errors are reported under `__all__`.
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|(a, _), (b, _)| a.cmp(b));
        let message = fields
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match (&e.message, &*e.code) {
                    (Some(message), _) => message.to_string(),
                    (None, "required") => format!("{field} is required"),
                    (None, _) => format!("{field} is invalid"),
                })
            })
            .collect::<Vec<_>>()
            .join("; ");
        ApiError::Validation(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
