//! Error taxonomy for the ingestion run and the feed server.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ConfigError;

/// Failures that abort a catalog sync. Pages committed before the failure stay
/// durable.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("credential exchange failed: {0}")]
    Auth(String),
    #[error("upstream catalog error: {0}")]
    Upstream(String),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Upstream(_) | SyncError::Storage(_))
    }
}

/// Failures while serving a feed request. Always rendered as a bare `500`.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("DB_PATH is not configured")]
    MissingDbPath,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("malformed course row: {0}")]
    MalformedRow(String),
    #[error("failed to render feed: {0}")]
    Render(#[from] anyhow::Error),
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self, "feed request failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
