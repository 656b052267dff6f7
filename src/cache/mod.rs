//! Cache Module
//!
//! Provides a file-backed value cache with external binary segments and
//! oldest-first eviction under a global size budget.

mod codec;
mod entry;
mod eviction;
mod index;
mod stats;
mod store;
mod value;


// Re-export public types
pub use codec::{encode, parse_document, EncodedEntry, ParsedDocument, PendingSegment, INLINE_THRESHOLD};
pub use entry::{document_path, segment_path, Entry};
pub use eviction::{evict, Eviction};
pub use index::{index_path, Index, INDEX_FILE};
pub use stats::CacheStats;
pub use store::{delete, read, stats, write, CacheStore, WriteOptions};
pub use value::CacheValue;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 200;

/// Key whose document would collide with the index file
const RESERVED_KEY: &str = "meta";

// == Key Validation ==
/// Checks that a key names a single file inside the cache root.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    if key.starts_with('.') {
        return Some("Key cannot start with '.'".to_string());
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Some("Key may only contain letters, digits, '_', '-' and '.'".to_string());
    }
    if key == RESERVED_KEY {
        return Some(format!("Key '{}' is reserved", RESERVED_KEY));
    }
    None
}
