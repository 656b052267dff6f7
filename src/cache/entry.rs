//! Cache Entry Module
//!
//! Defines the index record for a single cache entry and the on-disk file
//! names derived from its path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Suffix of the primary document file.
pub const DOCUMENT_SUFFIX: &str = ".json";
/// Suffix of a segment file, appended after `-<index>`.
pub const SEGMENT_SUFFIX: &str = ".bin";

// == Entry ==
/// Index record for one cached value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Caller-supplied path, also the prefix of the entry's files
    pub path: String,
    /// Document plus segment bytes
    pub size: u64,
    /// Creation timestamp (Unix milliseconds)
    pub created: i64,
}

impl Entry {
    /// Creates a new entry record.
    pub fn new(path: impl Into<String>, size: u64, created: i64) -> Self {
        Self {
            path: path.into(),
            size,
            created,
        }
    }
}

// == File Names ==
/// `<path>.json`
pub fn document_path(path: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", path, DOCUMENT_SUFFIX))
}

/// `<path>-<index>.bin`
pub fn segment_path(path: &str, index: usize) -> PathBuf {
    PathBuf::from(format!("{}-{}{}", path, index, SEGMENT_SUFFIX))
}

/// Cache path for a key stored under `cache_root`.
pub fn entry_path(cache_root: &Path, key: &str) -> String {
    cache_root.join(key).to_string_lossy().into_owned()
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
