//! Segment Cache - A persistent file-backed value cache
//!
//! Stores structured values as JSON documents, moves large binary payloads
//! into sibling segment files, and keeps the cache under a size budget by
//! evicting the oldest entries.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{delete, read, write, CacheStore, CacheValue, WriteOptions};
pub use config::Config;
pub use error::{CacheError, Result};
