//! API error types and HTTP status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result alias for HTTP handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Artifact id does not resolve (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Unknown item type, bad visibility value, malformed body (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Caller's department is not the source of the artifact (403)
    #[error("{0}")]
    NotOwner(String),

    /// Share attempted by a department outside any cluster (409)
    #[error("Department {0} is not part of any cluster")]
    NotInCluster(i64),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<crp_common::Error> for ApiError {
    fn from(err: crp_common::Error) -> Self {
        use crp_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::NotOwner(msg) => ApiError::NotOwner(msg),
            Error::NotInCluster(dept) => ApiError::NotInCluster(dept),
            Error::Database(e) => ApiError::Database(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotOwner(msg) => (StatusCode::FORBIDDEN, "NOT_OWNER", msg),
            ApiError::NotInCluster(dept) => (
                StatusCode::CONFLICT,
                "NOT_IN_CLUSTER",
                format!("Department {} is not part of any cluster", dept),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Database(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
