//! Cache Store Module
//!
//! Write, read and delete operations over a cache root: the codec turns
//! values into files, the index accounts for them, and eviction keeps the
//! total within budget.
//!
//! Callers must serialize mutating operations on one cache root. Each
//! operation loads the index, changes it and persists it, so two
//! concurrent writers can lose each other's accounting.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::codec::{encode, parse_document, segment_count, PendingSegment};
use crate::cache::entry::{current_timestamp_ms, document_path, entry_path, segment_path, Entry};
use crate::cache::eviction::evict;
use crate::cache::index::Index;
use crate::cache::{validate_key, CacheStats, CacheValue};
use crate::error::{CacheError, Result};

// == Write Options ==
/// Where the index lives and how large the cache may grow.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Directory holding `meta.json`
    pub cache_root: PathBuf,
    /// Budget for the sum of all entries, and for any single entry
    pub max_size: u64,
}

// == Write ==
/// Stores `value` under `path`, evicting the oldest entries first when the
/// write would push the cache over `max_size`.
///
/// Returns the index record of the new entry.
pub async fn write(path: &str, value: &CacheValue, options: &WriteOptions) -> Result<Entry> {
    let encoded = encode(value)?;
    let total_size = encoded.total_size();
    if total_size > options.max_size {
        return Err(CacheError::EntryTooLarge {
            size: total_size,
            max_size: options.max_size,
        });
    }

    let mut index = Index::load(&options.cache_root).await?;
    let replaced = index.remove(path);

    let projected = index.size + total_size;
    if projected > options.max_size {
        let eviction = evict(index, projected - options.max_size)?;
        info!(
            evicted = eviction.evicted.len(),
            freed = eviction.freed(),
            "Evicting oldest entries to make room for {}",
            path
        );
        try_join_all(eviction.evicted.iter().map(|e| remove_evicted(&e.path))).await?;
        index = eviction.index;
    }

    // drop any previous files so no stale segments outlive the new document
    match remove_entry_files(path).await {
        Ok(()) | Err(CacheError::EntryNotFound(_)) => {}
        Err(e) => return Err(e),
    }
    if let Some(previous) = replaced {
        debug!(path = %path, size = previous.size, "Replacing existing entry");
    }

    fs::write(document_path(path), &encoded.document).await?;

    let entry = Entry::new(path, total_size, index.next_created(current_timestamp_ms()));
    index.insert(entry.clone());
    index.persist(&options.cache_root).await?;

    try_join_all(
        encoded
            .segments
            .iter()
            .enumerate()
            .map(|(i, bytes)| fs::write(segment_path(path, i), bytes)),
    )
    .await?;

    debug!(
        path = %path,
        size = total_size,
        segments = encoded.segments.len(),
        "Wrote cache entry"
    );
    Ok(entry)
}

async fn remove_evicted(path: &str) -> Result<()> {
    match delete(path, None).await {
        Err(CacheError::EntryNotFound(_)) => {
            warn!(path = %path, "Evicted entry had no document on disk");
            Ok(())
        }
        other => other,
    }
}

// == Read ==
/// Loads the value stored under `path`. Does not consult the index.
pub async fn read(path: &str) -> Result<CacheValue> {
    let bytes = match fs::read(document_path(path)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CacheError::EntryNotFound(path.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let parsed = parse_document(path, &bytes)?;
    let segments = try_join_all(
        parsed
            .pending()
            .iter()
            .map(|segment| read_segment(path, *segment)),
    )
    .await?;

    debug!(path = %path, segments = segments.len(), "Read cache entry");
    parsed.materialize(segments)
}

async fn read_segment(path: &str, segment: PendingSegment) -> Result<Vec<u8>> {
    let bytes = match fs::read(segment_path(path, segment.index)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CacheError::corrupt_entry(
                path,
                format!("segment {} is missing", segment.index),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    if bytes.len() as u64 != segment.size {
        return Err(CacheError::corrupt_entry(
            path,
            format!(
                "segment {} has {} bytes, expected {}",
                segment.index,
                bytes.len(),
                segment.size
            ),
        ));
    }
    Ok(bytes)
}

// == Delete ==
/// Removes the document and segment files for `path`. With a cache root,
/// also drops the entry from that root's index.
pub async fn delete(path: &str, cache_root: Option<&Path>) -> Result<()> {
    remove_entry_files(path).await?;

    if let Some(root) = cache_root {
        let mut index = Index::load(root).await?;
        if index.remove(path).is_some() {
            index.persist(root).await?;
        }
    }

    debug!(path = %path, "Deleted cache entry");
    Ok(())
}

async fn remove_entry_files(path: &str) -> Result<()> {
    let document = document_path(path);
    let not_found = |e: std::io::Error| {
        if e.kind() == ErrorKind::NotFound {
            CacheError::EntryNotFound(path.to_string())
        } else {
            e.into()
        }
    };

    let bytes = fs::read(&document).await.map_err(not_found)?;
    let count = segment_count(&bytes);
    fs::remove_file(&document).await.map_err(not_found)?;

    match count {
        Some(count) => {
            for i in 0..count {
                remove_if_exists(&segment_path(path, i)).await?;
            }
        }
        None => {
            // header unreadable: scan indices until the first gap
            let mut i = 0;
            while remove_if_exists(&segment_path(path, i)).await? {
                i += 1;
            }
        }
    }
    Ok(())
}

async fn remove_if_exists(file: &Path) -> Result<bool> {
    match fs::remove_file(file).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// == Stats ==
/// Summarizes the index for `cache_root`.
pub async fn stats(cache_root: &Path, max_size: u64) -> Result<CacheStats> {
    let index = Index::load(cache_root).await?;
    Ok(CacheStats::from_index(&index, max_size))
}

// == Cache Store ==
/// A cache root and its budget, addressed by short keys instead of paths.
#[derive(Debug, Clone)]
pub struct CacheStore {
    options: WriteOptions,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store over `cache_root` holding at most `max_size` bytes.
    pub fn new(cache_root: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            options: WriteOptions {
                cache_root: cache_root.into(),
                max_size,
            },
        }
    }

    /// Size budget in bytes.
    pub fn max_size(&self) -> u64 {
        self.options.max_size
    }

    /// Cache path for `key`, after validating it.
    pub fn path_for(&self, key: &str) -> Result<String> {
        if let Some(message) = validate_key(key) {
            return Err(CacheError::InvalidRequest(message));
        }
        Ok(entry_path(&self.options.cache_root, key))
    }

    pub async fn write(&self, key: &str, value: &CacheValue) -> Result<Entry> {
        write(&self.path_for(key)?, value, &self.options).await
    }

    pub async fn read(&self, key: &str) -> Result<CacheValue> {
        read(&self.path_for(key)?).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        delete(&self.path_for(key)?, Some(&self.options.cache_root)).await
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        stats(&self.options.cache_root, self.options.max_size).await
    }
}
