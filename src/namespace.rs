//! Prefixed views over a shared store.
//!
//! A [`Namespaced`] store owns no state. Every key is qualified as
//! `prefix + delimiter + key` on the way in and stripped on the way out, and
//! change events for keys outside the namespace are suppressed.

use crate::api::KeyValueStore;
use crate::constants::DEFAULT_DELIMITER;
use crate::emitter::Subscription;
use crate::error::Result;
use crate::store::{SetOptions, StorageEvent};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Wraps `store` in a namespace using the default `:` delimiter.
///
/// # Example
///
/// ```
/// use kvstash::{KeyValueStore, Store, with_prefix};
///
/// let store = Store::memory();
/// let users = with_prefix(&store, "users");
///
/// users.set("42", "ada");
/// assert_eq!(store.get::<String>("users:42").as_deref(), Some("ada"));
/// assert_eq!(users.keys(), vec!["42".to_string()]);
/// ```
pub fn with_prefix<S: KeyValueStore>(store: S, prefix: impl Into<String>) -> Namespaced<S> {
    Namespaced::new(store, prefix)
}

/// A logical sub-store over `S` isolated by a key prefix.
#[derive(Clone, Debug)]
pub struct Namespaced<S> {
    inner: S,
    prefix: String,
    /// `prefix` followed by the delimiter.
    qualifier: String,
}

impl<S> Namespaced<S> {
    /// Namespace using the default delimiter.
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self::with_delimiter(store, prefix, DEFAULT_DELIMITER)
    }

    /// Namespace using a custom delimiter.
    pub fn with_delimiter(store: S, prefix: impl Into<String>, delimiter: &str) -> Self {
        let prefix = prefix.into();
        let qualifier = format!("{prefix}{delimiter}");
        Self {
            inner: store,
            prefix,
            qualifier,
        }
    }

    /// The namespace prefix, without delimiter.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn qualify(&self, key: &str) -> String {
        format!("{}{key}", self.qualifier)
    }
}

impl<S: KeyValueStore> KeyValueStore for Namespaced<S> {
    fn try_set_with<T>(&self, key: &str, value: &T, options: SetOptions) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.inner.try_set_with(&self.qualify(key), value, options)
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner.get(&self.qualify(key))
    }

    fn remove(&self, key: &str) {
        self.inner.remove(&self.qualify(key));
    }

    /// Removes this namespace's keys one by one; other keys are untouched.
    ///
    /// Not atomic: keys written by others during the scan may be missed.
    fn clear(&self) {
        for key in self.inner.keys() {
            if key.starts_with(&self.qualifier) {
                self.inner.remove(&key);
            }
        }
    }

    fn has(&self, key: &str) -> bool {
        self.inner.has(&self.qualify(key))
    }

    fn keys(&self) -> Vec<String> {
        self.inner
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.qualifier).map(str::to_string))
            .collect()
    }

    /// Forwards events for this namespace with the prefix stripped.
    ///
    /// `Clear` is always forwarded since it may have affected the namespace.
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        let qualifier = self.qualifier.clone();
        self.inner.subscribe(move |event| match event {
            StorageEvent::Clear => listener(event),
            StorageEvent::Set { key } => {
                if let Some(key) = key.strip_prefix(&qualifier) {
                    listener(&StorageEvent::set(key));
                }
            },
            StorageEvent::Remove { key } => {
                if let Some(key) = key.strip_prefix(&qualifier) {
                    listener(&StorageEvent::remove(key));
                }
            },
        })
    }
}
