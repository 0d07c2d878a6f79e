//! API error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portfolio_sync::{SourceError, SyncError};
use serde_json::json;
use thiserror::Error;

/// Error returned by a handler, rendered as `{"success": false, "error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Sync(e) => match e {
                SyncError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
                SyncError::Source(SourceError::NotFound { .. }) => StatusCode::NOT_FOUND,
                SyncError::Source(SourceError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
                SyncError::Source(_) | SyncError::Summarizer(_) => StatusCode::BAD_GATEWAY,
                SyncError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}
