//! Operation surface shared by stores and namespaced views.

use crate::emitter::Subscription;
use crate::error::Result;
use crate::store::{SetOptions, StorageEvent};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Key-value operations over JSON values with optional expiry.
///
/// Implemented by [`crate::Store`] and [`crate::Namespaced`], so a
/// namespaced view can wrap another namespaced view. Apart from the `try_*`
/// operation, failures are never reported: unreadable or expired values read
/// as absent and failed writes are dropped.
pub trait KeyValueStore {
    /// Writes `value` under `key`, reporting why the write was dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or the surface
    /// rejects the write (quota, access). Nothing is published on error.
    fn try_set_with<T>(&self, key: &str, value: &T, options: SetOptions) -> Result<()>
    where
        T: Serialize + ?Sized;

    /// Writes `value` under `key` with the given options. Failures are dropped.
    fn set_with<T>(&self, key: &str, value: &T, options: SetOptions)
    where
        T: Serialize + ?Sized,
    {
        let _ = self.try_set_with(key, value, options);
    }

    /// Writes `value` under `key` without expiry.
    fn set<T>(&self, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        self.set_with(key, value, SetOptions::default());
    }

    /// Writes `value` under `key`, expiring after `ttl`.
    fn set_with_ttl<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize + ?Sized,
    {
        self.set_with(key, value, SetOptions::ttl(ttl));
    }

    /// Reads the value under `key`. Absent, expired, unreadable or
    /// mistyped values are `None`; an expired value is purged on the way.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T>;

    /// Removes `key` and always publishes `Remove`.
    fn remove(&self, key: &str);

    /// Removes every key owned by this store.
    fn clear(&self);

    /// True if `get` would return a value. Purges an expired value.
    fn has(&self, key: &str) -> bool;

    /// Live keys in backend enumeration order; expired keys are skipped.
    fn keys(&self) -> Vec<String>;

    /// Registers a change listener.
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn try_set_with<T>(&self, key: &str, value: &T, options: SetOptions) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        (**self).try_set_with(key, value, options)
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        (**self).get(key)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }

    fn clear(&self) {
        (**self).clear();
    }

    fn has(&self, key: &str) -> bool {
        (**self).has(key)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        (**self).subscribe(listener)
    }
}
