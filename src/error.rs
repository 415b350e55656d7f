//! Custom error types and handling
//!
//! This module defines the application's error types and implements
//! conversion to HTTP responses for the Axum framework.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::{services::auth_service::AuthError, utils::validation::FieldViolation};

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Forbidden")]
    Forbidden,

    // Validation errors
    #[error("Invalid request body ({} violations)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("Invalid query parameters ({} violations)", .0.len())]
    InvalidQuery(Vec<FieldViolation>),

    // Dependency errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// Body of every non-validation error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log dependency errors in full but never expose them to clients
        match self {
            AppError::Unauthorized => {
                (status, Json(ErrorResponse { error: "Unauthorized" })).into_response()
            }
            AppError::InvalidToken(reason) => {
                tracing::debug!(reason = %reason, "Rejected bearer token");
                (status, Json(ErrorResponse { error: "Unauthorized" })).into_response()
            }
            AppError::Forbidden => {
                (status, Json(ErrorResponse { error: "Forbidden" })).into_response()
            }
            AppError::Validation(errors) => {
                (status, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::InvalidQuery(details) => (
                status,
                Json(json!({ "error": "Invalid query parameters", "details": details })),
            )
                .into_response(),
            AppError::Database(e) => {
                tracing::error!(error = ?e, "Database error");
                internal_error()
            }
            AppError::Serialization(e) => {
                tracing::error!(error = ?e, "Serialization error");
                internal_error()
            }
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal Server Error",
        }),
    )
        .into_response()
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => AppError::Unauthorized,
            AuthError::InvalidToken(e) => AppError::InvalidToken(e.to_string()),
            AuthError::Forbidden => AppError::Forbidden,
            AuthError::Signing(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
