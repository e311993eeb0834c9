//! Host environment: shared storage areas and the cross-context signal.
//!
//! A [`Host`] stands for the environment that owns the persistence surfaces
//! (one per [`Scope`]) and a broadcast bus. Each [`HostContext`] is one
//! execution context attached to it; contexts see each other's writes
//! through the shared surfaces and learn about them through [`HostSignal`]s.
//!
//! # Example
//!
//! ```
//! use kvstash::host::Host;
//! use kvstash::{KeyValueStore, Stores};
//!
//! let host = Host::in_memory();
//! let first = Stores::init(Some(&host.context()));
//! let second = Stores::init(Some(&host.context()));
//!
//! first.local.set("theme", "dark");
//! assert_eq!(second.local.get::<String>("theme").as_deref(), Some("dark"));
//! assert_eq!(second.local.pump_host_signals(), 1);
//! ```

mod area;
mod signal;

pub use area::{HostArea, HostBinding, SignalFilter};
pub use signal::{AreaId, ContextId, HostSignal, Scope};

use crate::backend::{MemoryBackend, RedbBackend, StorageBackend};
use crate::config::StoreConfig;
use crate::constants::DEFAULT_SIGNAL_CAPACITY;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::broadcast;

struct Surface {
    id: AreaId,
    backend: Arc<dyn StorageBackend>,
}

impl Surface {
    fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            id: AreaId::new(),
            backend,
        }
    }
}

struct HostInner {
    local: Surface,
    session: Surface,
    accessible: bool,
    bus: broadcast::Sender<HostSignal>,
}

/// Environment owning the shared storage areas.
///
/// `Host` is `Clone`; clones refer to the same areas and bus.
#[derive(Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

impl Host {
    /// Host with in-memory local and session surfaces.
    pub fn in_memory() -> Self {
        Self::with_surfaces(
            Arc::new(MemoryBackend::new()),
            Arc::new(MemoryBackend::new()),
            DEFAULT_SIGNAL_CAPACITY,
        )
    }

    /// Host over the given surfaces, buffering up to `signal_capacity`
    /// undelivered signals per listening context.
    pub fn with_surfaces(
        local: Arc<dyn StorageBackend>,
        session: Arc<dyn StorageBackend>,
        signal_capacity: usize,
    ) -> Self {
        Self::build(local, session, signal_capacity, true)
    }

    /// Host built from configuration.
    ///
    /// The local surface is a redb file when `local_path` is set, memory
    /// otherwise. The session surface is always memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the local database cannot be opened.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let local: Arc<dyn StorageBackend> = match &config.local_path {
            Some(path) => Arc::new(RedbBackend::open(path)?),
            None => Arc::new(config.memory_surface()),
        };
        let session = Arc::new(config.memory_surface());
        Ok(Self::build(local, session, config.signal_capacity, true))
    }

    /// Host whose areas refuse every access, as in locked-down environments.
    pub fn unavailable() -> Self {
        Self::build(
            Arc::new(MemoryBackend::new()),
            Arc::new(MemoryBackend::new()),
            DEFAULT_SIGNAL_CAPACITY,
            false,
        )
    }

    fn build(
        local: Arc<dyn StorageBackend>,
        session: Arc<dyn StorageBackend>,
        signal_capacity: usize,
        accessible: bool,
    ) -> Self {
        let (bus, _) = broadcast::channel(signal_capacity.max(1));
        Self {
            inner: Arc::new(HostInner {
                local: Surface::new(local),
                session: Surface::new(session),
                accessible,
                bus,
            }),
        }
    }

    /// Attaches a new execution context.
    pub fn context(&self) -> HostContext {
        HostContext {
            host: self.clone(),
            id: ContextId::new(),
        }
    }

    /// Whether the host grants access to its areas.
    pub fn is_accessible(&self) -> bool {
        self.inner.accessible
    }

    fn surface(&self, scope: Scope) -> &Surface {
        match scope {
            Scope::Local => &self.inner.local,
            Scope::Session => &self.inner.session,
        }
    }

    fn bus(&self) -> &broadcast::Sender<HostSignal> {
        &self.inner.bus
    }
}

/// One execution context attached to a [`Host`].
#[derive(Clone)]
pub struct HostContext {
    host: Host,
    id: ContextId,
}

impl HostContext {
    /// Identity of this context.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The host this context is attached to.
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// The area for `scope`, bound to this context.
    pub fn area(&self, scope: Scope) -> HostArea {
        HostArea::new(self.host.clone(), scope, self.id)
    }

    /// Local-scope area.
    pub fn local_area(&self) -> HostArea {
        self.area(Scope::Local)
    }

    /// Session-scope area.
    pub fn session_area(&self) -> HostArea {
        self.area(Scope::Session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_share_surfaces() {
        let host = Host::in_memory();
        let a = host.context().local_area();
        let b = host.context().local_area();

        a.set_raw("k", "v").unwrap();
        assert_eq!(b.get_raw("k").as_deref(), Some("v"));
        assert_eq!(a.id(), b.id());
        assert_ne!(a.context(), b.context());
    }

    #[test]
    fn test_scopes_are_isolated() {
        let context = Host::in_memory().context();

        context.local_area().set_raw("k", "local").unwrap();
        assert_eq!(context.session_area().get_raw("k"), None);
        assert_ne!(context.local_area().id(), context.session_area().id());
    }

    #[test]
    fn test_mutations_broadcast_signals() {
        let host = Host::in_memory();
        let writer = host.context().local_area();
        let mut binding = host.context().local_area().host_binding().unwrap();

        writer.set_raw("k", "1").unwrap();
        writer.remove_raw("k").unwrap();
        writer.set_raw("k", "2").unwrap();
        writer.clear_all().unwrap();

        let set = binding.signals.try_recv().unwrap();
        assert!(binding.filter.accepts(&set));
        assert_eq!(set.key.as_deref(), Some("k"));
        assert_eq!(set.old_value, None);
        assert_eq!(set.new_value.as_deref(), Some("1"));

        let removed = binding.signals.try_recv().unwrap();
        assert_eq!(removed.old_value.as_deref(), Some("1"));
        assert_eq!(removed.new_value, None);

        binding.signals.try_recv().unwrap();
        let cleared = binding.signals.try_recv().unwrap();
        assert_eq!(cleared.key, None);
        assert!(binding.signals.try_recv().is_err());
    }

    #[test]
    fn test_noop_mutations_are_silent() {
        let host = Host::in_memory();
        let writer = host.context().local_area();
        let mut binding = host.context().local_area().host_binding().unwrap();

        writer.remove_raw("missing").unwrap();
        writer.clear_all().unwrap();
        writer.set_raw("k", "same").unwrap();
        writer.set_raw("k", "same").unwrap();

        assert!(binding.signals.try_recv().is_ok());
        assert!(binding.signals.try_recv().is_err());
    }

    #[test]
    fn test_binding_rejects_own_and_foreign_area_signals() {
        let host = Host::in_memory();
        let context = host.context();
        let mut local = context.local_area().host_binding().unwrap();

        context.local_area().set_raw("mine", "1").unwrap();
        host.context().session_area().set_raw("theirs", "1").unwrap();

        let own = local.signals.try_recv().unwrap();
        assert!(!local.filter.accepts(&own));
        let foreign = local.signals.try_recv().unwrap();
        assert!(!local.filter.accepts(&foreign));
    }

    #[test]
    fn test_unavailable_host_refuses_access() {
        let area = Host::unavailable().context().local_area();

        assert!(area.probe().is_err());
        assert!(matches!(
            area.set_raw("k", "v"),
            Err(crate::Error::Unavailable(_))
        ));
        assert_eq!(area.get_raw("k"), None);
        assert_eq!(area.count(), 0);
    }

    #[test]
    fn test_probe_leaves_no_trace() {
        let host = Host::in_memory();
        let area = host.context().local_area();
        let mut binding = host.context().local_area().host_binding().unwrap();

        area.probe().unwrap();
        assert_eq!(area.count(), 0);
        assert!(binding.signals.try_recv().is_err());
    }

    #[test]
    fn test_probe_restores_existing_entry() {
        let local = Arc::new(MemoryBackend::new());
        local.set_raw("__kvstash_probe__", r#"{"v":"user data"}"#).unwrap();
        local.set_raw("after", "1").unwrap();
        let host = Host::with_surfaces(local.clone(), Arc::new(MemoryBackend::new()), 4);

        host.context().local_area().probe().unwrap();

        assert_eq!(
            local.get_raw("__kvstash_probe__").as_deref(),
            Some(r#"{"v":"user data"}"#)
        );
        assert_eq!(local.all_keys(), vec!["__kvstash_probe__", "after"]);
    }
}
