//! Event, diagnostic and option types for the store.

use std::time::Duration;

/// One observed mutation of a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageEvent {
    /// A value was written under `key`.
    Set { key: String },
    /// `key` was removed (or expired on read).
    Remove { key: String },
    /// Every key was removed.
    Clear,
}

impl StorageEvent {
    /// Key affected by the event, `None` for `Clear`.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Set { key } | Self::Remove { key } => Some(key),
            Self::Clear => None,
        }
    }

    pub(crate) fn set(key: impl Into<String>) -> Self {
        Self::Set { key: key.into() }
    }

    pub(crate) fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }
}

/// Failures the store recovered from without telling the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A `set` failed (serialization or quota) and was dropped.
    WriteSuppressed { key: String, reason: String },
    /// Stored bytes under `key` could not be decoded; read as absent.
    Unreadable { key: String },
    /// Removing `key` from the surface failed.
    RemoveFailed { key: String, reason: String },
    /// Clearing the surface failed.
    ClearFailed { reason: String },
    /// The cross-context signal receiver fell behind and dropped signals.
    ///
    /// Dropped signals may include this store's own, which are never relayed.
    SignalsLagged { missed: u64 },
}

/// Options for `set`.
///
/// ```
/// use kvstash::SetOptions;
/// use std::time::Duration;
///
/// let options = SetOptions::ttl(Duration::from_secs(30));
/// assert_eq!(options.ttl, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Time-to-live. `None` or zero means the value never expires.
    pub ttl: Option<Duration>,
}

impl SetOptions {
    /// Options with the given time-to-live.
    pub fn ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }

    /// Options with a time-to-live in milliseconds.
    pub fn ttl_millis(millis: u64) -> Self {
        Self::ttl(Duration::from_millis(millis))
    }

    /// The TTL in milliseconds, rounded up, if it is positive.
    pub(crate) fn positive_ttl_millis(&self) -> Option<i64> {
        self.ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| i64::try_from(ttl.as_nanos().div_ceil(1_000_000)).unwrap_or(i64::MAX))
    }
}

impl From<Duration> for SetOptions {
    fn from(ttl: Duration) -> Self {
        Self::ttl(ttl)
    }
}
