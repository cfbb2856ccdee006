//! Error handling module for the drinks backend.
//!
//! Provides the application error type with mapping to HTTP status codes and the
//! uniform `{success, error, message}` response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Canonical client-facing messages.
pub mod messages {
    pub const BAD_REQUEST: &str = "bad request";
    pub const UNPROCESSABLE: &str = "unprocessable";
    pub const NOT_FOUND: &str = "resource not found";
    pub const METHOD_NOT_ALLOWED: &str = "method not allowed";
    pub const INTERNAL_ERROR: &str = "internal server error";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request body or field
    BadRequest(String),
    /// Missing, invalid or duplicate input
    Validation(String),
    /// Resource not found
    NotFound(String),
    /// Credential or permission failure with an explicit status
    Auth {
        status: StatusCode,
        code: &'static str,
        description: &'static str,
    },
    /// Verb not supported on a known path
    MethodNotAllowed,
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth { status, .. } => *status,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => messages::BAD_REQUEST,
            AppError::Validation(_) => messages::UNPROCESSABLE,
            AppError::NotFound(_) => messages::NOT_FOUND,
            AppError::Auth { description, .. } => *description,
            AppError::MethodNotAllowed => messages::METHOD_NOT_ALLOWED,
            AppError::Database(_) | AppError::Internal(_) => messages::INTERNAL_ERROR,
        }
    }

    /// Get the detailed error message.
    pub fn message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Auth {
                code, description, ..
            } => format!("{}: {}", code, description),
            AppError::MethodNotAllowed => messages::METHOD_NOT_ALLOWED.to_string(),
            AppError::Database(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status_code().as_u16(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: error.status_code().as_u16(),
            message: error.public_message().to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}

/// Router fallback for paths that match no route.
pub async fn not_found_fallback() -> AppError {
    AppError::NotFound("No route for path".to_string())
}

/// Router fallback for known paths hit with an unsupported verb.
pub async fn method_not_allowed_fallback() -> AppError {
    AppError::MethodNotAllowed
}
