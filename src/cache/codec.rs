//! Entry Codec Module
//!
//! Splits a value into a primary JSON document and an ordered list of
//! binary segments, and reassembles it. The codec does no I/O; the store
//! reads and writes the files.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::value::{external_marker, is_marker_shaped, parse_marker, CacheValue, Marker};
use crate::error::{CacheError, Result};

/// Buffers of at least this many bytes are stored as segment files.
pub const INLINE_THRESHOLD: usize = 1024;

/// Current primary document format.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    segments: usize,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct DocumentHeader {
    version: u32,
    segments: usize,
}

// == Encoded Entry ==
/// Output of [`encode`]: the document bytes and the extracted segments in
/// traversal order.
#[derive(Debug, Clone)]
pub struct EncodedEntry {
    pub document: Vec<u8>,
    pub segments: Vec<Vec<u8>>,
}

impl EncodedEntry {
    /// Document length plus every segment length.
    pub fn total_size(&self) -> u64 {
        self.document.len() as u64 + self.segments.iter().map(|s| s.len() as u64).sum::<u64>()
    }
}

// == Encode ==
/// Encodes a value, extracting every buffer of `INLINE_THRESHOLD` bytes or
/// more into its own segment.
pub fn encode(value: &CacheValue) -> Result<EncodedEntry> {
    let mut segments = Vec::new();
    let tree = extract(value, &mut segments)?;
    let document = serde_json::to_vec(&Document {
        version: DOCUMENT_VERSION,
        segments: segments.len(),
        value: tree,
    })
    .map_err(|e| CacheError::InvalidRequest(format!("Value is not serializable: {}", e)))?;

    Ok(EncodedEntry { document, segments })
}

fn extract(value: &CacheValue, segments: &mut Vec<Vec<u8>>) -> Result<Value> {
    Ok(match value {
        CacheValue::Bytes(bytes) if bytes.len() >= INLINE_THRESHOLD => {
            let index = segments.len();
            segments.push(bytes.clone());
            external_marker(index, bytes.len() as u64)
        }
        CacheValue::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| extract(item, segments))
                .collect::<Result<Vec<_>>>()?,
        ),
        CacheValue::Map(map) => {
            if is_marker_shaped(map) {
                return Err(CacheError::InvalidRequest(
                    "Map has the reserved binary marker shape".to_string(),
                ));
            }
            let mut object = serde_json::Map::new();
            for (key, item) in map {
                object.insert(key.clone(), extract(item, segments)?);
            }
            Value::Object(object)
        }
        other => other.to_json(),
    })
}

// == Decode ==
/// A segment that must be loaded before the value can be materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSegment {
    pub index: usize,
    pub size: u64,
}

/// A parsed primary document whose external segments are not yet loaded.
#[derive(Debug)]
pub struct ParsedDocument {
    path: String,
    tree: Value,
    pending: Vec<PendingSegment>,
}

/// Parses a primary document and validates its placeholders against the
/// recorded segment count. Placeholders must cover `0..segments` exactly once.
pub fn parse_document(path: &str, bytes: &[u8]) -> Result<ParsedDocument> {
    let document: Document = serde_json::from_slice(bytes)
        .map_err(|e| CacheError::corrupt_entry(path, format!("unreadable document: {}", e)))?;

    if document.version != DOCUMENT_VERSION {
        return Err(CacheError::corrupt_entry(
            path,
            format!("unsupported document version {}", document.version),
        ));
    }

    let mut pending = Vec::new();
    collect_pending(&document.value, &mut pending);

    let mut seen = HashSet::new();
    for segment in &pending {
        if segment.index >= document.segments || !seen.insert(segment.index) {
            return Err(CacheError::corrupt_entry(
                path,
                format!("placeholder references invalid segment {}", segment.index),
            ));
        }
    }
    if pending.len() != document.segments {
        return Err(CacheError::corrupt_entry(
            path,
            format!(
                "document declares {} segments but references {}",
                document.segments,
                pending.len()
            ),
        ));
    }
    pending.sort_by_key(|s| s.index);

    Ok(ParsedDocument {
        path: path.to_string(),
        tree: document.value,
        pending,
    })
}

/// Reads only the segment count from a document header.
pub fn segment_count(bytes: &[u8]) -> Option<usize> {
    serde_json::from_slice::<DocumentHeader>(bytes)
        .ok()
        .filter(|header| header.version == DOCUMENT_VERSION)
        .map(|header| header.segments)
}

fn collect_pending(value: &Value, pending: &mut Vec<PendingSegment>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_pending(item, pending)),
        Value::Object(map) => match parse_marker(map) {
            Some(Marker::External { index, size }) => pending.push(PendingSegment { index, size }),
            Some(Marker::Buffer(_)) => {}
            None => map.values().for_each(|item| collect_pending(item, pending)),
        },
        _ => {}
    }
}

impl ParsedDocument {
    /// Segments to load, ordered by index.
    pub fn pending(&self) -> &[PendingSegment] {
        &self.pending
    }

    /// Builds the value, filling placeholders from `segments`, where
    /// `segments[i]` holds the contents of segment file `i`.
    pub fn materialize(self, segments: Vec<Vec<u8>>) -> Result<CacheValue> {
        if segments.len() != self.pending.len() {
            return Err(CacheError::corrupt_entry(
                &self.path,
                format!(
                    "expected {} segments, got {}",
                    self.pending.len(),
                    segments.len()
                ),
            ));
        }
        for (segment, bytes) in self.pending.iter().zip(&segments) {
            if bytes.len() as u64 != segment.size {
                return Err(CacheError::corrupt_entry(
                    &self.path,
                    format!(
                        "segment {} has {} bytes, expected {}",
                        segment.index,
                        bytes.len(),
                        segment.size
                    ),
                ));
            }
        }

        let mut slots: Vec<Option<Vec<u8>>> = segments.into_iter().map(Some).collect();
        fill(self.tree, &mut slots, &self.path)
    }
}

fn fill(value: Value, slots: &mut [Option<Vec<u8>>], path: &str) -> Result<CacheValue> {
    Ok(match value {
        Value::Array(items) => CacheValue::Array(
            items
                .into_iter()
                .map(|item| fill(item, slots, path))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(map) => match parse_marker(&map) {
            Some(Marker::Buffer(bytes)) => CacheValue::Bytes(bytes),
            Some(Marker::External { index, .. }) => {
                let bytes = slots.get_mut(index).and_then(Option::take).ok_or_else(|| {
                    CacheError::corrupt_entry(path, format!("segment {} is not available", index))
                })?;
                CacheValue::Bytes(bytes)
            }
            None => {
                let mut out = std::collections::BTreeMap::new();
                for (key, item) in map {
                    out.insert(key, fill(item, slots, path)?);
                }
                CacheValue::Map(out)
            }
        },
        other => CacheValue::from(other),
    })
}
