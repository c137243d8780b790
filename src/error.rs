use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure of a single collaborator call
///
/// Whether it is recoverable is decided by the caller: library-store failures
/// abort the request, every other source degrades to an empty contribution.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("{0} timed out")]
    Timeout(&'static str),
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Profile store unavailable: {0}")]
    ProfileStore(#[source] SourceError),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ProfileStore(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Cancelled(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub type SourceResult<T> = Result<T, SourceError>;
