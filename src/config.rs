//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Default cache budget: 512 MiB
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 512 * 1024 * 1024;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding cache documents, segments and the index
    pub cache_root: PathBuf,
    /// Maximum total cache size in bytes
    pub max_cache_size: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ROOT` - Cache directory (default: ./cache)
    /// - `MAX_CACHE_SIZE` - Cache budget in bytes (default: 512 MiB)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_root: env::var("CACHE_ROOT")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_root),
            max_cache_size: env::var("MAX_CACHE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_cache_size),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from("./cache"),
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            server_port: 3000,
        }
    }
}
