//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for reading an entry (GET /entries/:key)
#[derive(Debug, Clone, Serialize)]
pub struct ReadResponse {
    /// The requested key
    pub key: String,
    /// The stored value, with bytes rendered as buffer markers
    pub value: Value,
}

impl ReadResponse {
    /// Creates a new ReadResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for writing an entry (PUT /entries/:key)
#[derive(Debug, Clone, Serialize)]
pub struct WriteResponse {
    /// Success message
    pub message: String,
    /// The key that was written
    pub key: String,
    /// Encoded size charged against the cache budget
    pub size: u64,
}

impl WriteResponse {
    /// Creates a new WriteResponse
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' written successfully", key),
            key,
            size,
        }
    }
}

/// Response body for deleting an entry (DELETE /entries/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of live entries
    pub entries: usize,
    /// Bytes used by live entries
    pub total_size: u64,
    /// Cache budget in bytes
    pub max_size: u64,
    /// Bytes writable before eviction starts
    pub remaining: u64,
    /// total_size / max_size
    pub utilization: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            entries: stats.entries,
            total_size: stats.total_size,
            max_size: stats.max_size,
            remaining: stats.remaining(),
            utilization: stats.utilization(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
