//! Backend adapters: the raw string surface the store writes envelopes to.
//!
//! Every surface, whether a host area or the in-memory fallback, is exposed
//! through [`StorageBackend`] so the store never needs to know which one it
//! was given.
//!
//! - **HostArea**: a host-provided area that broadcasts changes to other
//!   contexts sharing it (see [`crate::host`])
//! - **RedbBackend**: durable file-backed surface, used under a host's
//!   local-scope area
//! - **MemoryBackend**: non-persistent fallback when no host surface is usable

mod memory;
mod redb;

pub use memory::MemoryBackend;
pub use redb::RedbBackend;

use crate::error::Result;
use crate::host::{HostArea, HostBinding};
use std::sync::Arc;
use tracing::debug;

/// Uniform capability interface over a raw key-value surface.
///
/// All backends must be thread-safe (`Send + Sync`). Reads never fail: a
/// surface that cannot be read reports the key as absent. Writes report
/// failures so the store can decide whether a mutation happened.
pub trait StorageBackend: Send + Sync + 'static {
    /// Returns the raw string stored under `key`.
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is full, unavailable or fails.
    fn set_raw(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is unavailable or fails.
    fn remove_raw(&self, key: &str) -> Result<()>;

    /// Removes every key.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface is unavailable or fails.
    fn clear_all(&self) -> Result<()>;

    /// Number of stored keys, expired envelopes included.
    fn count(&self) -> usize;

    /// Key at `index` in the surface's enumeration order.
    ///
    /// The order is only stable between mutations.
    fn key_at(&self, index: usize) -> Option<String>;

    /// Every key in enumeration order, read as one snapshot.
    ///
    /// The default walks `count` and `key_at`; surfaces with a cheaper bulk
    /// read should override it.
    fn all_keys(&self) -> Vec<String> {
        (0..self.count())
            .filter_map(|index| self.key_at(index))
            .collect()
    }

    /// Cross-context signal binding, for surfaces shared with other contexts.
    fn host_binding(&self) -> Option<HostBinding> {
        None
    }
}

/// Picks the surface for one storage scope.
///
/// Uses the host area when one exists and accepts a probe write; otherwise
/// returns `fallback`. Falling back is the expected path in host-less
/// environments and is only logged at debug level.
pub fn select_backend(candidate: Option<HostArea>, fallback: MemoryBackend) -> Arc<dyn StorageBackend> {
    match candidate {
        Some(area) => match area.probe() {
            Ok(()) => Arc::new(area),
            Err(err) => {
                debug!(scope = %area.scope(), error = %err, "Host storage inaccessible, using in-memory fallback");
                Arc::new(fallback)
            },
        },
        None => {
            debug!("No host storage surface, using in-memory fallback");
            Arc::new(fallback)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;

    #[test]
    fn test_select_without_host_uses_fallback() {
        let backend = select_backend(None, MemoryBackend::new());
        assert!(backend.host_binding().is_none());
        backend.set_raw("k", "v").unwrap();
        assert_eq!(backend.get_raw("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_select_prefers_accessible_host_area() {
        let host = Host::in_memory();
        let context = host.context();

        let backend = select_backend(Some(context.local_area()), MemoryBackend::new());
        assert!(backend.host_binding().is_some());
        // The probe leaves nothing behind
        assert_eq!(backend.count(), 0);
    }

    #[test]
    fn test_select_falls_back_when_host_refuses_access() {
        let host = Host::unavailable();
        let context = host.context();

        let backend = select_backend(Some(context.local_area()), MemoryBackend::new());
        assert!(backend.host_binding().is_none());
        backend.set_raw("k", "v").unwrap();
        assert_eq!(backend.count(), 1);
    }
}
