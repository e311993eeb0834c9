//! Host storage areas as seen from one execution context.

use super::signal::{AreaId, ContextId, HostSignal, Scope};
use super::Host;
use crate::backend::StorageBackend;
use crate::error::{Error, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::trace;

/// Key written and removed by [`HostArea::probe`].
const PROBE_KEY: &str = "__kvstash_probe__";

/// One scope of a host's storage, bound to the context that uses it.
///
/// Mutations that change the shared surface are broadcast to every other
/// context of the same host. Writing a value identical to the stored one,
/// removing a missing key or clearing an empty area broadcasts nothing.
#[derive(Clone)]
pub struct HostArea {
    host: Host,
    scope: Scope,
    context: ContextId,
}

/// Which host signals a store relays: changes to its area made elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalFilter {
    /// Area the store is bound to.
    pub area: AreaId,
    /// Context the store runs in.
    pub context: ContextId,
}

impl SignalFilter {
    /// True for signals about this area made by some other context.
    pub fn accepts(&self, signal: &HostSignal) -> bool {
        signal.area == self.area && signal.origin != self.context
    }
}

/// Cross-context signal subscription handed to a store by its backend.
#[derive(Debug)]
pub struct HostBinding {
    /// Signals this binding is interested in.
    pub filter: SignalFilter,
    /// Receiver on the host-wide signal bus.
    pub signals: broadcast::Receiver<HostSignal>,
}

impl HostArea {
    pub(crate) fn new(host: Host, scope: Scope, context: ContextId) -> Self {
        Self {
            host,
            scope,
            context,
        }
    }

    /// Scope of this area.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Identity of the shared area.
    pub fn id(&self) -> AreaId {
        self.host.surface(self.scope).id
    }

    /// Context this handle writes on behalf of.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Checks the area accepts writes, without notifying other contexts.
    ///
    /// A value already stored under the probe key is written back afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses access or the probe write fails.
    pub fn probe(&self) -> Result<()> {
        self.ensure_accessible()?;
        let surface = &self.host.surface(self.scope).backend;
        let existing = surface.get_raw(PROBE_KEY);
        surface.set_raw(PROBE_KEY, PROBE_KEY)?;
        match existing {
            Some(value) => surface.set_raw(PROBE_KEY, &value),
            None => surface.remove_raw(PROBE_KEY),
        }
    }

    fn ensure_accessible(&self) -> Result<()> {
        if self.host.is_accessible() {
            Ok(())
        } else {
            Err(Error::unavailable(format!("{} storage access denied", self.scope)))
        }
    }

    fn surface(&self) -> &dyn StorageBackend {
        self.host.surface(self.scope).backend.as_ref()
    }

    fn broadcast(&self, key: Option<&str>, old_value: Option<String>, new_value: Option<&str>) {
        let signal = HostSignal {
            area: self.id(),
            origin: self.context,
            key: key.map(str::to_string),
            old_value,
            new_value: new_value.map(str::to_string),
            timestamp: Utc::now(),
        };
        // send() fails only when no context is listening
        let receivers = self.host.bus().send(signal).unwrap_or(0);
        trace!(scope = %self.scope, key = key.unwrap_or("*"), receivers, "Broadcast storage signal");
    }
}

impl StorageBackend for HostArea {
    fn get_raw(&self, key: &str) -> Option<String> {
        if !self.host.is_accessible() {
            return None;
        }
        self.surface().get_raw(key)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_accessible()?;
        let old_value = self.surface().get_raw(key);
        self.surface().set_raw(key, value)?;

        if old_value.as_deref() != Some(value) {
            self.broadcast(Some(key), old_value, Some(value));
        }
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        self.ensure_accessible()?;
        let old_value = self.surface().get_raw(key);
        self.surface().remove_raw(key)?;

        if old_value.is_some() {
            self.broadcast(Some(key), old_value, None);
        }
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        self.ensure_accessible()?;
        let had_entries = self.surface().count() > 0;
        self.surface().clear_all()?;

        if had_entries {
            self.broadcast(None, None, None);
        }
        Ok(())
    }

    fn count(&self) -> usize {
        if !self.host.is_accessible() {
            return 0;
        }
        self.surface().count()
    }

    fn key_at(&self, index: usize) -> Option<String> {
        if !self.host.is_accessible() {
            return None;
        }
        self.surface().key_at(index)
    }

    fn all_keys(&self) -> Vec<String> {
        if !self.host.is_accessible() {
            return Vec::new();
        }
        self.surface().all_keys()
    }

    fn host_binding(&self) -> Option<HostBinding> {
        Some(HostBinding {
            filter: SignalFilter {
                area: self.id(),
                context: self.context,
            },
            signals: self.host.bus().subscribe(),
        })
    }
}
