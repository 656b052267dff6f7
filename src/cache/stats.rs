//! Cache Statistics Module
//!
//! Summarizes a cache root's index against its size budget.

use serde::Serialize;

use crate::cache::index::Index;

// == Cache Stats ==
/// Snapshot of a cache root's occupancy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of live entries
    pub entries: usize,
    /// Bytes accounted to live entries
    pub total_size: u64,
    /// Configured size budget in bytes
    pub max_size: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Builds stats from an index and the budget it is held to.
    pub fn from_index(index: &Index, max_size: u64) -> Self {
        Self {
            entries: index.len(),
            total_size: index.size,
            max_size,
        }
    }

    // == Utilization ==
    /// Calculates total_size / max_size, or 0.0 for a zero budget.
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.total_size as f64 / self.max_size as f64
        }
    }

    /// Bytes that can still be written without eviction.
    pub fn remaining(&self) -> u64 {
        self.max_size.saturating_sub(self.total_size)
    }
}
