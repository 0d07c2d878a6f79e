//! Typed errors for the portfolio sync library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Only failures that stop an operation outright are errors. A single
//! unreadable file, subfolder or row is recorded as an
//! [`ItemError`](crate::types::scan::ItemError) on the scan result instead.

use thiserror::Error;

/// Errors that can occur during a sync operation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Content source failed (listing or fetching)
    #[error("content source error: {0}")]
    Source(#[from] SourceError),

    /// Summarizer unavailable or failed
    #[error("summarizer error: {0}")]
    Summarizer(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Record id passed to an update does not exist
    #[error("record not found: {id}")]
    RecordNotFound { id: String },

    /// A new record was requested without a name
    #[error("cannot create a record without a name")]
    MissingName,

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Caller-supplied deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error (missing identifiers or credentials)
    #[error("config error: {0}")]
    Config(String),
}

/// Errors returned by a content source (folders, documents, sheets).
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Remote API answered with a non-success status
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Item or folder does not exist
    #[error("item not found: {id}")]
    NotFound { id: String },

    /// Payload could not be decoded as text
    #[error("cannot decode {id}: {reason}")]
    Decode { id: String, reason: String },

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Call did not finish in time
    #[error("timeout fetching: {id}")]
    Timeout { id: String },
}

impl SyncError {
    /// Wrap any error as a storage failure.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage(err.into())
    }

    /// Wrap any error as a summarizer failure.
    pub fn summarizer(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Summarizer(err.into())
    }
}

impl SourceError {
    /// Wrap any error as an HTTP failure.
    pub fn http(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Http(err.into())
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for content source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_converts_into_sync_error() {
        let err: SyncError = SourceError::NotFound { id: "abc".into() }.into();
        assert!(matches!(err, SyncError::Source(SourceError::NotFound { .. })));
        assert_eq!(err.to_string(), "content source error: item not found: abc");
    }

    #[test]
    fn test_storage_helper_keeps_message() {
        let err = SyncError::storage("lock poisoned");
        assert_eq!(err.to_string(), "storage error: lock poisoned");
    }
}
