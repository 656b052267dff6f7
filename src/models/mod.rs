//! Response models for the cache server API
//!
//! This module defines the DTOs (Data Transfer Objects) serialized into
//! HTTP response bodies. Request bodies are arbitrary JSON values.

pub mod responses;

// Re-export commonly used types
pub use responses::{DeleteResponse, HealthResponse, ReadResponse, StatsResponse, WriteResponse};
