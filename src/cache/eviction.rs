//! Eviction Module
//!
//! Oldest-first eviction over an index value. Selecting victims is pure;
//! the store deletes their files afterwards.

use crate::cache::entry::Entry;
use crate::cache::index::Index;
use crate::error::{CacheError, Result};

// == Eviction Plan ==
/// Result of [`evict`]: the index with victims removed, and the victims.
#[derive(Debug, Clone)]
pub struct Eviction {
    pub index: Index,
    pub evicted: Vec<Entry>,
}

impl Eviction {
    /// Bytes released by the evicted entries.
    pub fn freed(&self) -> u64 {
        self.evicted.iter().map(|e| e.size).sum()
    }
}

// == Evict ==
/// Removes the oldest entries from `index` until at least `bytes_to_reduce`
/// bytes are freed.
///
/// Entries are ordered by `created`; equal timestamps fall back to path
/// order. Fails with `EvictionInsufficientSpace` when all entries together
/// are smaller than `bytes_to_reduce`, leaving the index untouched.
pub fn evict(mut index: Index, bytes_to_reduce: u64) -> Result<Eviction> {
    if bytes_to_reduce == 0 {
        return Ok(Eviction {
            index,
            evicted: Vec::new(),
        });
    }

    let available = index.entries_size();
    if available < bytes_to_reduce {
        return Err(CacheError::EvictionInsufficientSpace {
            needed: bytes_to_reduce,
            available,
        });
    }

    let mut oldest: Vec<(i64, String)> = index
        .entries
        .values()
        .map(|e| (e.created, e.path.clone()))
        .collect();
    oldest.sort();

    let mut freed = 0u64;
    let mut evicted = Vec::new();
    for (_, path) in oldest {
        if freed >= bytes_to_reduce {
            break;
        }
        if let Some(entry) = index.remove(&path) {
            freed += entry.size;
            evicted.push(entry);
        }
    }

    Ok(Eviction { index, evicted })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(entries: &[(&str, u64, i64)]) -> Index {
        let mut index = Index::default();
        for (path, size, created) in entries {
            index.insert(Entry::new(*path, *size, *created));
        }
        index
    }

    fn paths(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_evict_oldest_first() {
        let index = index_of(&[("c", 300, 3), ("a", 100, 1), ("b", 200, 2)]);

        let result = evict(index, 250).unwrap();
        assert_eq!(paths(&result.evicted), vec!["a", "b"]);
        assert_eq!(result.freed(), 300);
        assert_eq!(result.index.size, 300);
        assert!(result.index.entries.contains_key("c"));
        assert!(result.index.is_consistent());
    }

    #[test]
    fn test_evict_stops_once_enough_freed() {
        let index = index_of(&[("a", 100, 1), ("b", 200, 2)]);

        let result = evict(index, 100).unwrap();
        assert_eq!(paths(&result.evicted), vec!["a"]);
        assert_eq!(result.index.len(), 1);
    }

    #[test]
    fn test_evict_nothing_requested() {
        let index = index_of(&[("a", 100, 1)]);

        let result = evict(index.clone(), 0).unwrap();
        assert!(result.evicted.is_empty());
        assert_eq!(result.index, index);
    }

    #[test]
    fn test_evict_tie_breaks_by_path() {
        let index = index_of(&[("b", 10, 5), ("a", 10, 5)]);

        let result = evict(index, 10).unwrap();
        assert_eq!(paths(&result.evicted), vec!["a"]);
    }

    #[test]
    fn test_evict_insufficient_space() {
        let index = index_of(&[("a", 100, 1), ("b", 200, 2)]);

        let result = evict(index, 301);
        assert!(matches!(
            result,
            Err(CacheError::EvictionInsufficientSpace {
                needed: 301,
                available: 300
            })
        ));
    }

    #[test]
    fn test_evict_empty_index() {
        let result = evict(Index::default(), 1);
        assert!(matches!(
            result,
            Err(CacheError::EvictionInsufficientSpace { available: 0, .. })
        ));
    }

    #[test]
    fn test_evicts_older_entry_when_pair_exceeds_budget() {
        // 1500 bytes cached, 1000 more arriving, 2048 byte budget
        let max_size = 2048u64;
        let index = index_of(&[("A", 1500, 100)]);
        let incoming = 1000u64;

        let over = index.size + incoming - max_size;
        let mut result = evict(index, over).unwrap();
        assert_eq!(paths(&result.evicted), vec!["A"]);

        result.index.insert(Entry::new("B", incoming, 200));
        assert_eq!(result.index.len(), 1);
        assert_eq!(result.index.size, 1000);
    }
}
