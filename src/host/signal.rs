//! Identities and the cross-context signal broadcast by host areas.

use crate::store::StorageEvent;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Identity of one storage area of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaId(Uuid);

impl AreaId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of one execution context attached to a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifetime scope of a storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Shared by every context and kept across sessions.
    Local,
    /// Shared by every context for the lifetime of the host.
    Session,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Session => f.write_str("session"),
        }
    }
}

/// Notification that a context changed a shared area.
///
/// `key` is `None` when the area was cleared; `new_value` is `None` when
/// `key` was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSignal {
    /// Area that changed.
    pub area: AreaId,
    /// Context that made the change.
    pub origin: ContextId,
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// When the change was made.
    pub timestamp: DateTime<Utc>,
}

impl HostSignal {
    /// The store event describing this change.
    pub fn to_event(&self) -> StorageEvent {
        match (&self.key, &self.new_value) {
            (None, _) => StorageEvent::Clear,
            (Some(key), None) => StorageEvent::remove(key.as_str()),
            (Some(key), Some(_)) => StorageEvent::set(key.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(key: Option<&str>, new_value: Option<&str>) -> HostSignal {
        HostSignal {
            area: AreaId::new(),
            origin: ContextId::new(),
            key: key.map(str::to_string),
            old_value: None,
            new_value: new_value.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_signal_to_event_mapping() {
        assert_eq!(signal(None, None).to_event(), StorageEvent::Clear);
        assert_eq!(
            signal(Some("k"), None).to_event(),
            StorageEvent::Remove { key: "k".into() }
        );
        assert_eq!(
            signal(Some("k"), Some(r#"{"v":1}"#)).to_event(),
            StorageEvent::Set { key: "k".into() }
        );
    }

    #[test]
    fn test_identities_are_unique() {
        assert_ne!(AreaId::new(), AreaId::new());
        assert_ne!(ContextId::new(), ContextId::new());
        assert_eq!(Scope::Session.to_string(), "session");
    }
}
