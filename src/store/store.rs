//! The store engine: envelopes, lazy expiry and change notification over
//! one backend surface.

use super::envelope::Envelope;
use super::types::{Diagnostic, SetOptions, StorageEvent};
use crate::api::KeyValueStore;
use crate::backend::{MemoryBackend, StorageBackend};
use crate::clock::{Clock, SystemClock};
use crate::emitter::{Emitter, Subscription};
use crate::error::{Error, Result};
use crate::host::{HostBinding, HostSignal, SignalFilter};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Cross-context relay state kept from the backend's host binding.
struct Relay {
    filter: SignalFilter,
    /// Taken by `spawn_host_relay`; `None` afterwards.
    signals: Mutex<Option<Receiver<HostSignal>>>,
}

impl Relay {
    fn from_binding(binding: HostBinding) -> Self {
        Self {
            filter: binding.filter,
            signals: Mutex::new(Some(binding.signals)),
        }
    }
}

struct StoreInner {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    events: Emitter<StorageEvent>,
    diagnostics: Emitter<Diagnostic>,
    relay: Option<Relay>,
}

/// JSON key-value store with lazy expiry and change notification.
///
/// Values are wrapped in an [`Envelope`] and written to the backend as JSON.
/// Expired values are discovered on access (`get`, `has`, `keys`) and purged
/// then; nothing runs in the background.
///
/// When the backend is a host area, changes made by other contexts are
/// relayed to subscribers as the same events, via
/// [`Store::pump_host_signals`] or [`Store::spawn_host_relay`].
///
/// # Thread Safety
///
/// `Store` is `Clone` and can be shared across threads; clones share the
/// backend and the listeners.
///
/// # Example
///
/// ```
/// use kvstash::{KeyValueStore, Store};
/// use std::time::Duration;
///
/// let store = Store::memory();
/// store.set("user", &serde_json::json!({"id": 1}));
/// store.set_with_ttl("token", "abc", Duration::from_secs(60));
///
/// assert_eq!(store.get::<String>("token").as_deref(), Some("abc"));
/// assert!(store.has("user"));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Creates a store over `backend` using `clock` for expiry.
    pub fn new(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        let relay = backend.host_binding().map(Relay::from_binding);
        Self {
            inner: Arc::new(StoreInner {
                backend,
                clock,
                events: Emitter::new(),
                diagnostics: Emitter::new(),
                relay,
            }),
        }
    }

    /// Creates a store over an unlimited in-memory backend.
    pub fn memory() -> Self {
        Self::custom(MemoryBackend::new())
    }

    /// Creates a store over a custom backend.
    pub fn custom<B: StorageBackend>(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Creates a store over a shared backend.
    pub fn from_arc(backend: Arc<dyn StorageBackend>) -> Self {
        Self::new(backend, Arc::new(SystemClock))
    }

    /// Whether this store relays changes made by other host contexts.
    pub fn is_host_backed(&self) -> bool {
        self.inner.relay.is_some()
    }

    /// Number of live keys. Purges expired values like `keys`.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// True if no live keys remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a listener for failures the store recovered from silently.
    pub fn subscribe_diagnostics<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.inner.diagnostics.subscribe(listener)
    }

    /// Relays every pending signal from other contexts to subscribers.
    ///
    /// Returns the number of events published. Returns 0 for stores that are
    /// not host-backed or whose relay was handed to [`Store::spawn_host_relay`].
    ///
    /// The receiver buffers every signal on the host bus, this store's own
    /// included, up to the host's signal capacity. A store that writes more
    /// than that between pumps reports [`Diagnostic::SignalsLagged`] even if
    /// no other context changed anything; callers that need a precise
    /// picture should re-read the keys they care about after a lag.
    pub fn pump_host_signals(&self) -> usize {
        let Some(relay) = &self.inner.relay else {
            return 0;
        };

        let mut relayed = 0;
        loop {
            // Lock released before publishing so listeners may pump again
            let received = match relay.signals.lock().as_mut() {
                Some(signals) => signals.try_recv(),
                None => return relayed,
            };

            match received {
                Ok(signal) => {
                    if self.relay_signal(relay, &signal) {
                        relayed += 1;
                    }
                },
                Err(TryRecvError::Lagged(missed)) => self.signals_lagged(missed),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return relayed,
            }
        }
    }

    /// Relays signals from other contexts on a tokio task as they arrive.
    ///
    /// Takes over from [`Store::pump_host_signals`]. Returns `None` when the
    /// store is not host-backed, the relay is already running, or no tokio
    /// runtime is available. The task ends once every clone of the store has
    /// been dropped and a further signal arrives, or the host goes away.
    pub fn spawn_host_relay(&self) -> Option<JoinHandle<()>> {
        let relay = self.inner.relay.as_ref()?;
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let mut signals = relay.signals.lock().take()?;
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);

        Some(runtime.spawn(async move {
            loop {
                let received = signals.recv().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let store = Store { inner };

                match received {
                    Ok(signal) => {
                        if let Some(relay) = &store.inner.relay {
                            store.relay_signal(relay, &signal);
                        }
                    },
                    Err(RecvError::Lagged(missed)) => store.signals_lagged(missed),
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Host signal relay stopped");
        }))
    }

    fn relay_signal(&self, relay: &Relay, signal: &HostSignal) -> bool {
        if !relay.filter.accepts(signal) {
            return false;
        }
        let event = signal.to_event();
        debug!(?event, origin = %signal.origin, "Relaying change from another context");
        self.inner.events.publish(&event);
        true
    }

    fn signals_lagged(&self, missed: u64) {
        warn!(missed, "Host signal receiver lagged, changes from other contexts were dropped");
        self.inner
            .diagnostics
            .publish(&Diagnostic::SignalsLagged { missed });
    }

    /// Reads and decodes the envelope under `key`, purging it if expired.
    fn read_envelope(&self, key: &str) -> Option<Envelope> {
        let raw = self.inner.backend.get_raw(key)?;

        let Some(envelope) = Envelope::decode(&raw) else {
            debug!(key, "Stored value is not a valid envelope, reading as absent");
            self.inner.diagnostics.publish(&Diagnostic::Unreadable {
                key: key.to_string(),
            });
            return None;
        };

        if envelope.is_expired_at(self.inner.clock.now_millis()) {
            debug!(key, expiry = ?envelope.expiry, "Purging expired entry");
            self.remove_entry(key);
            return None;
        }

        Some(envelope)
    }

    /// Removes `key` best-effort and publishes `Remove` regardless.
    fn remove_entry(&self, key: &str) {
        if let Err(err) = self.inner.backend.remove_raw(key) {
            warn!(key, error = %err, "Remove failed");
            self.inner.diagnostics.publish(&Diagnostic::RemoveFailed {
                key: key.to_string(),
                reason: err.to_string(),
            });
        }
        self.inner.events.publish(&StorageEvent::remove(key));
    }

    fn encode<T>(&self, key: &str, value: &T, options: SetOptions) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let expiry = options
            .positive_ttl_millis()
            .map(|ttl| self.inner.clock.now_millis().saturating_add(ttl));
        let value = serde_json::to_value(value).map_err(|err| Error::serialization(key, err))?;
        Envelope::new(value, expiry)
            .encode()
            .map_err(|err| Error::serialization(key, err))
    }
}

impl KeyValueStore for Store {
    fn try_set_with<T>(&self, key: &str, value: &T, options: SetOptions) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let written = self
            .encode(key, value, options)
            .and_then(|raw| self.inner.backend.set_raw(key, &raw));

        match written {
            Ok(()) => {
                self.inner.events.publish(&StorageEvent::set(key));
                Ok(())
            },
            Err(err) => {
                warn!(key, error = %err, "Write suppressed");
                self.inner.diagnostics.publish(&Diagnostic::WriteSuppressed {
                    key: key.to_string(),
                    reason: err.to_string(),
                });
                Err(err)
            },
        }
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let envelope = self.read_envelope(key)?;
        match serde_json::from_value(envelope.value) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key, error = %err, "Stored value does not match requested type");
                None
            },
        }
    }

    fn remove(&self, key: &str) {
        self.remove_entry(key);
    }

    fn clear(&self) {
        if let Err(err) = self.inner.backend.clear_all() {
            warn!(error = %err, "Clear failed");
            self.inner.diagnostics.publish(&Diagnostic::ClearFailed {
                reason: err.to_string(),
            });
        }
        self.inner.events.publish(&StorageEvent::Clear);
    }

    fn has(&self, key: &str) -> bool {
        self.read_envelope(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        // Snapshot first: purging expired keys shifts indices
        self.inner
            .backend
            .all_keys()
            .into_iter()
            .filter(|key| self.has(key))
            .collect()
    }

    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(listener)
    }
}
