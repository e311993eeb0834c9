//! Synchronous publish/subscribe bus for change notifications.
//!
//! Delivery happens on the publishing thread, in subscription order. A
//! publish works on a snapshot of the registered listeners, so callbacks may
//! subscribe, unsubscribe or publish again without deadlocking.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Slot<E> {
    id: u64,
    active: Arc<AtomicBool>,
    listener: Listener<E>,
}

struct Registry<E> {
    next_id: AtomicU64,
    slots: RwLock<Vec<Slot<E>>>,
}

trait Unregister: Send + Sync {
    fn unregister(&self, id: u64);
}

impl<E: 'static> Unregister for Registry<E> {
    fn unregister(&self, id: u64) {
        self.slots.write().retain(|slot| slot.id != id);
    }
}

/// Publish/subscribe bus delivering events of type `E` to local listeners.
///
/// `Emitter` is `Clone`; clones share the same listener registry.
pub struct Emitter<E> {
    registry: Arc<Registry<E>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E: 'static> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> Emitter<E> {
    /// Creates an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(0),
                slots: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Registers a listener and returns the handle that cancels it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));

        self.registry.slots.write().push(Slot {
            id,
            active: Arc::clone(&active),
            listener: Arc::new(listener),
        });

        let registry: Weak<dyn Unregister> = Arc::downgrade(&self.registry) as Weak<dyn Unregister>;
        Subscription {
            id,
            active,
            registry,
        }
    }

    /// Delivers `event` to every listener registered when the call starts.
    ///
    /// A listener cancelled mid-round is not invoked after its cancellation.
    /// Returns the number of listeners invoked.
    pub fn publish(&self, event: &E) -> usize {
        let snapshot: Vec<(Arc<AtomicBool>, Listener<E>)> = self
            .registry
            .slots
            .read()
            .iter()
            .map(|slot| (Arc::clone(&slot.active), Arc::clone(&slot.listener)))
            .collect();

        let mut delivered = 0;
        for (active, listener) in snapshot {
            if active.load(Ordering::SeqCst) {
                listener(event);
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.slots.read().len()
    }
}

/// Handle returned by `subscribe`; cancels the listener when unsubscribed.
///
/// Dropping the handle leaves the listener registered. Cancellation is
/// always explicit through [`Subscription::unsubscribe`].
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    registry: Weak<dyn Unregister>,
}

impl Subscription {
    /// Cancels the listener. Calling it again has no effect.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst)
            && let Some(registry) = self.registry.upgrade()
        {
            registry.unregister(self.id);
        }
    }

    /// Returns true until `unsubscribe` has been called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
