// ABOUTME: API module containing all HTTP handler functions for the cassncase JSON API.
// ABOUTME: Sub-modules cover order reads and search, action recording, admin tasks, and the change stream.

pub mod actions;
pub mod admin;
pub mod orders;
pub mod stream;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cassncase_store::{StoreError, WriteError};
use thiserror::Error;

/// Failures a handler can return, each mapped to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Write(WriteError::OrderNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Write(
                WriteError::ImmutableField(_)
                | WriteError::ReservedField(_)
                | WriteError::ConfirmWithChanges,
            ) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Write(WriteError::Store(_)) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
