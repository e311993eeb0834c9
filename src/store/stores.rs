//! Explicitly constructed local- and session-scope stores.

use super::store::Store;
use crate::backend::select_backend;
use crate::config::StoreConfig;
use crate::host::HostContext;
use crate::namespace::Namespaced;

/// The pair of stores an application uses: one per storage scope.
///
/// Construct once during initialization and pass it to the code that needs
/// it; clones share the same stores.
///
/// # Example
///
/// ```
/// use kvstash::{KeyValueStore, Stores};
///
/// // No host surface: both scopes fall back to memory.
/// let stores = Stores::init(None);
/// stores.session.set("draft", "hello");
/// assert!(!stores.local.has("draft"));
/// ```
#[derive(Clone)]
pub struct Stores {
    /// Local-scope store.
    pub local: Store,
    /// Session-scope store.
    pub session: Store,
    delimiter: String,
}

impl Stores {
    /// Builds both stores with default configuration.
    ///
    /// Each scope uses the context's host area when it is accessible and an
    /// in-memory fallback otherwise.
    pub fn init(context: Option<&HostContext>) -> Self {
        Self::init_with(context, &StoreConfig::default())
    }

    /// Builds both stores; fallbacks honor the configured quota.
    pub fn init_with(context: Option<&HostContext>, config: &StoreConfig) -> Self {
        let local = select_backend(context.map(HostContext::local_area), config.memory_surface());
        let session = select_backend(context.map(HostContext::session_area), config.memory_surface());

        Self {
            local: Store::from_arc(local),
            session: Store::from_arc(session),
            delimiter: config.delimiter.clone(),
        }
    }

    /// Namespaced view of the local store using the configured delimiter.
    pub fn local_namespace(&self, prefix: &str) -> Namespaced<Store> {
        Namespaced::with_delimiter(self.local.clone(), prefix, &self.delimiter)
    }

    /// Namespaced view of the session store using the configured delimiter.
    pub fn session_namespace(&self, prefix: &str) -> Namespaced<Store> {
        Namespaced::with_delimiter(self.session.clone(), prefix, &self.delimiter)
    }
}
