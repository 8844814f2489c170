// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent callable responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// The response categories mirror the small set of error codes callable
/// clients understand: `unauthenticated`, `not-found`, `invalid-argument`,
/// `permission-denied` and `internal`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A multi-group batch commit stopped part way through.
    ///
    /// Groups before the failing one remain applied.
    #[error(
        "Batch commit failed after {committed_groups} group(s) ({committed_operations} operations): {reason}"
    )]
    PartialCommit {
        committed_groups: usize,
        committed_operations: usize,
        reason: String,
    },

    #[error("Payment processor error: {0}")]
    Payment(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Callable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::NotFound(_) => "not-found",
            AppError::InvalidArgument(_) => "invalid-argument",
            AppError::PermissionDenied(_) => "permission-denied",
            AppError::Database(_)
            | AppError::PartialCommit { .. }
            | AppError::Payment(_)
            | AppError::Internal(_) => "internal",
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
            AppError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            AppError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, Some(msg.clone())),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::PartialCommit { .. } => {
                tracing::error!(error = %self, "Partial batch commit");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Payment(msg) => {
                tracing::error!(error = %msg, "Payment processor error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
