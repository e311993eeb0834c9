//! In-memory fallback backend.
//!
//! Keeps keys in insertion order so index-based enumeration is stable
//! between mutations. Nothing survives the process.

use super::StorageBackend;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;

#[derive(Default)]
struct Entries {
    map: IndexMap<String, String>,
    /// Sum of key and value lengths in bytes.
    used: usize,
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// In-memory key-value surface with an optional byte quota.
///
/// # Example
///
/// ```
/// use kvstash::backend::{MemoryBackend, StorageBackend};
///
/// let backend = MemoryBackend::with_quota(16);
/// backend.set_raw("k", "small").unwrap();
/// assert!(backend.set_raw("k2", "far too large for the quota").is_err());
/// ```
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<Entries>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Creates an empty, unlimited backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend rejecting writes past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.entries.read().used
    }

    /// Configured quota, `None` when unlimited.
    pub fn quota_bytes(&self) -> Option<usize> {
        self.quota_bytes
    }
}

impl StorageBackend for MemoryBackend {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.read().map.get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let old_size = entries.map.get(key).map_or(0, |old| entry_size(key, old));
        let projected = entries.used - old_size + entry_size(key, value);

        if let Some(limit) = self.quota_bytes
            && projected > limit
        {
            return Err(Error::quota_exceeded(key, projected, limit));
        }

        entries.map.insert(key.to_string(), value.to_string());
        entries.used = projected;
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write();
        if let Some(old) = entries.map.shift_remove(key) {
            entries.used -= entry_size(key, &old);
        }
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let mut entries = self.entries.write();
        entries.map.clear();
        entries.used = 0;
        Ok(())
    }

    fn count(&self) -> usize {
        self.entries.read().map.len()
    }

    fn key_at(&self, index: usize) -> Option<String> {
        self.entries
            .read()
            .map
            .get_index(index)
            .map(|(key, _)| key.clone())
    }

    fn all_keys(&self) -> Vec<String> {
        self.entries.read().map.keys().cloned().collect()
    }
}
