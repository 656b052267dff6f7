//! Error types for the cache store
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Encoded entry is larger than the whole cache budget
    #[error("Entry too large: {size} bytes exceeds maximum cache size of {max_size} bytes")]
    EntryTooLarge { size: u64, max_size: u64 },

    /// Metadata index exists but does not parse
    #[error("Corrupt index at {}: {source}", path.display())]
    CorruptIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Primary document or one of its segments is missing or inconsistent
    #[error("Corrupt entry {path}: {reason}")]
    CorruptEntry { path: String, reason: String },

    /// No primary document exists for the path
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Evicting every entry still would not free enough space
    #[error("Cannot free {needed} bytes: only {available} bytes are evictable")]
    EvictionInsufficientSpace { needed: u64, available: u64 },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    pub(crate) fn corrupt_entry(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CacheError::CorruptEntry {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::EntryNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::EntryTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::EvictionInsufficientSpace { .. } => StatusCode::INSUFFICIENT_STORAGE,
            CacheError::CorruptIndex { .. } | CacheError::CorruptEntry { .. } | CacheError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache store.
pub type Result<T> = std::result::Result<T, CacheError>;
