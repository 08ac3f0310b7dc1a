//! Error types for the Koha sync server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The addressed sync code has no record
    #[error("not_found")]
    NotFound,

    /// Method, query and body do not name a sync operation
    #[error("invalid_request")]
    InvalidRequest,

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failures of the persistent key-value store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to encode or decode record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Object store error: {0}")]
    ObjectStore(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidRequest => StatusCode::BAD_REQUEST,
            AppError::MalformedPayload(e) => {
                tracing::warn!("Rejected malformed payload: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}
