//! # API Error Types
//!
//! Maps engine, artifact and store errors to HTTP responses with a JSON
//! body `{"error": {"code", "message"}}`. Internal failures are logged
//! and answered with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use llp_artifact::ArtifactError;
use llp_engine::{GroupAuthError, ResolveError};
use llp_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "FORBIDDEN").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
///
/// Internal and storage details are never exposed to clients.
#[derive(Error, Debug)]
pub enum AppError {
    /// No such artifact or license, or a hidden name (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed digest, return URL or query (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Access denied. The message is shown to the client as-is (403).
    #[error("{0}")]
    Forbidden(String),

    /// Internal server error (500). Logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),

    /// Object storage failed or timed out (500).
    #[error("storage error: {0}")]
    Storage(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Storage(_) => "A storage backend error occurred".to_string(),
            Self::NotFound(_) => "Not found".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Storage(_) => tracing::error!(error = %self, "storage backend error"),
            Self::NotFound(_) => tracing::debug!(error = %self, "not found"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        match err {
            e if e.is_not_found() => Self::NotFound(e.to_string()),
            ArtifactError::Storage(e) => Self::Storage(e.to_string()),
            e => Self::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Artifact(e) => e.into(),
            ResolveError::Store(e) => e.into(),
            e @ ResolveError::Template { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl From<GroupAuthError> for AppError {
    fn from(err: GroupAuthError) -> Self {
        Self::Internal(err.to_string())
    }
}
