//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::{CacheStore, CacheValue};
use crate::error::Result;
use crate::models::{DeleteResponse, HealthResponse, ReadResponse, StatsResponse, WriteResponse};

/// Application state shared across all handlers.
///
/// The store is wrapped in Arc<RwLock<>> so writes and deletes on the cache
/// root are serialized while reads share the lock.
#[derive(Clone)]
pub struct AppState {
    /// Cache store for the configured root
    pub cache: Arc<RwLock<CacheStore>>,
    /// Largest accepted request body in bytes
    pub body_limit: usize,
}

impl AppState {
    /// Creates a new AppState with the given cache store.
    pub fn new(cache: CacheStore) -> Self {
        Self {
            body_limit: body_limit_for(cache.max_size()),
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(CacheStore::new(
            config.cache_root.clone(),
            config.max_cache_size,
        ))
    }
}

/// Worst-case JSON bytes per payload byte in a `Buffer` marker ("255,")
const MARKER_BYTES_PER_BYTE: u64 = 4;

/// Headroom for the document structure around the payload
const BODY_LIMIT_SLACK: u64 = 64 * 1024;

/// Request body limit large enough to carry any entry the budget admits.
pub fn body_limit_for(max_size: u64) -> usize {
    let limit = max_size
        .saturating_mul(MARKER_BYTES_PER_BYTE)
        .saturating_add(BODY_LIMIT_SLACK);
    usize::try_from(limit).unwrap_or(usize::MAX)
}

/// Handler for PUT /entries/:key
///
/// Stores the JSON body under the key. Objects shaped like
/// `{"type":"Buffer","data":[...]}` are stored as binary.
pub async fn write_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<WriteResponse>> {
    let value = CacheValue::from(body);

    // Exclusive lock: the index is loaded, changed and persisted
    let cache = state.cache.write().await;
    let entry = cache.write(&key, &value).await?;

    Ok(Json(WriteResponse::new(key, entry.size)))
}

/// Handler for GET /entries/:key
pub async fn read_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ReadResponse>> {
    let cache = state.cache.read().await;
    let value = cache.read(&key).await?;

    Ok(Json(ReadResponse::new(key, value.to_json())))
}

/// Handler for DELETE /entries/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let cache = state.cache.write().await;
    cache.delete(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let cache = state.cache.read().await;
    let stats = cache.stats().await?;

    Ok(Json(StatsResponse::from(stats)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
