//! Metadata Index Module
//!
//! The persisted registry of live entries and their aggregate size. The
//! index is a plain value: load it, change it, persist it. Nothing is
//! cached between calls.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::cache::entry::Entry;
use crate::error::{CacheError, Result};

/// File name of the index inside a cache root.
pub const INDEX_FILE: &str = "meta.json";

// == Index ==
/// Entry registry for one cache root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Sum of all entry sizes
    pub size: u64,
    /// Entries keyed by path
    pub entries: BTreeMap<String, Entry>,
}

/// `<cache_root>/meta.json`
pub fn index_path(cache_root: &Path) -> PathBuf {
    cache_root.join(INDEX_FILE)
}

impl Index {
    // == Load ==
    /// Reads the index for `cache_root`. A missing file yields an empty index.
    pub async fn load(cache_root: &Path) -> Result<Self> {
        let path = index_path(cache_root);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let index: Index = serde_json::from_slice(&bytes)
            .map_err(|source| CacheError::CorruptIndex { path, source })?;

        if !index.is_consistent() {
            warn!(
                recorded = index.size,
                actual = index.entries_size(),
                "Index size does not match the sum of its entries"
            );
        }

        Ok(index)
    }

    // == Persist ==
    /// Overwrites the index file. The new content is written beside the
    /// index and renamed over it.
    pub async fn persist(&self, cache_root: &Path) -> Result<()> {
        let path = index_path(cache_root);
        let tmp = cache_root.join(format!("{}.tmp", INDEX_FILE));
        let bytes = serde_json::to_vec(self).map_err(std::io::Error::from)?;

        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    // == Insert ==
    /// Records an entry and adds its size. Replaces any entry with the same
    /// path, subtracting the old size first.
    pub fn insert(&mut self, entry: Entry) {
        self.remove(&entry.path);
        self.size += entry.size;
        self.entries.insert(entry.path.clone(), entry);
    }

    // == Remove ==
    /// Drops an entry and subtracts its size.
    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        let entry = self.entries.remove(path)?;
        self.size = self.size.saturating_sub(entry.size);
        Some(entry)
    }

    /// Timestamp for a new entry: never earlier than any existing entry.
    pub fn next_created(&self, now: i64) -> i64 {
        self.entries
            .values()
            .map(|e| e.created)
            .max()
            .map_or(now, |latest| latest.max(now))
    }

    /// Sum of entry sizes, independent of the recorded total.
    pub fn entries_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }

    /// True when the recorded total matches the entries.
    pub fn is_consistent(&self) -> bool {
        self.size == self.entries_size()
    }

    // == Length ==
    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_missing_returns_empty() {
        let dir = tempdir().unwrap();
        let index = Index::load(dir.path()).await.unwrap();
        assert_eq!(index, Index::default());
        assert_eq!(index.size, 0);
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let dir = tempdir().unwrap();
        let mut index = Index::default();
        index.insert(Entry::new("a", 10, 1));
        index.insert(Entry::new("b", 20, 2));

        index.persist(dir.path()).await.unwrap();
        assert!(!dir.path().join("meta.json.tmp").exists());

        let loaded = Index::load(dir.path()).await.unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.size, 30);
    }

    #[tokio::test]
    async fn test_load_corrupt_index() {
        let dir = tempdir().unwrap();
        std::fs::write(index_path(dir.path()), b"{\"size\": \"lots\"}").unwrap();

        let result = Index::load(dir.path()).await;
        assert!(matches!(result, Err(CacheError::CorruptIndex { .. })));
    }

    #[tokio::test]
    async fn test_load_propagates_other_io_errors() {
        let dir = tempdir().unwrap();
        // a directory where the index file should be
        std::fs::create_dir(index_path(dir.path())).unwrap();

        let result = Index::load(dir.path()).await;
        assert!(matches!(result, Err(CacheError::Io(_))));
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut index = Index::default();
        index.insert(Entry::new("a", 100, 1));
        index.insert(Entry::new("a", 40, 2));

        assert_eq!(index.len(), 1);
        assert_eq!(index.size, 40);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_remove() {
        let mut index = Index::default();
        index.insert(Entry::new("a", 100, 1));

        assert_eq!(index.remove("a").map(|e| e.size), Some(100));
        assert_eq!(index.remove("a"), None);
        assert_eq!(index.size, 0);
    }

    #[test]
    fn test_next_created_is_monotonic() {
        let mut index = Index::default();
        assert_eq!(index.next_created(50), 50);

        index.insert(Entry::new("a", 1, 200));
        assert_eq!(index.next_created(150), 200);
        assert_eq!(index.next_created(300), 300);
    }

    #[test]
    fn test_inconsistent_size_detected() {
        let mut index = Index::default();
        index.insert(Entry::new("a", 10, 1));
        index.size = 99;
        assert!(!index.is_consistent());
        assert_eq!(index.entries_size(), 10);
    }
}
