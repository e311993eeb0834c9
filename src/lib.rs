//! # kvstash
//!
//! JSON key-value storage over a host persistence surface, with optional
//! time-to-live, change notification and key namespacing.
//!
//! ## Features
//!
//! - Values of any `serde` type, stored as `{"v": value, "e": expiry}`
//! - Lazy expiration: expired values are purged when read or enumerated
//! - Change events for local writes and for writes made by other contexts
//!   sharing the same host area
//! - Namespaced views isolating keys by prefix over one shared store
//! - Graceful fallback to memory when no host surface is usable
//!
//! ## Example
//!
//! ```rust
//! use kvstash::{KeyValueStore, StorageEvent, Stores, with_prefix};
//! use kvstash::host::Host;
//! use std::time::Duration;
//!
//! let host = Host::in_memory();
//! let stores = Stores::init(Some(&host.context()));
//!
//! let sub = stores.local.subscribe(|event| {
//!     if let StorageEvent::Set { key } = event {
//!         println!("{key} changed");
//!     }
//! });
//!
//! stores.local.set_with_ttl("token", "abc", Duration::from_secs(60));
//! let prefs = with_prefix(stores.local.clone(), "prefs");
//! prefs.set("theme", "dark");
//!
//! assert_eq!(stores.local.get::<String>("prefs:theme").as_deref(), Some("dark"));
//! sub.unsubscribe();
//! ```

pub mod backend;
pub mod host;
pub mod logging;

mod api;
mod clock;
mod config;
mod constants;
mod emitter;
mod error;
mod namespace;
mod store;

pub use api::KeyValueStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{StoreConfig, ValidationResult};
pub use constants::{DEFAULT_DELIMITER, DEFAULT_QUOTA_BYTES, DEFAULT_SIGNAL_CAPACITY};
pub use emitter::{Emitter, Subscription};
pub use error::{Error, Result};
pub use namespace::{Namespaced, with_prefix};
pub use store::{Diagnostic, Envelope, SetOptions, StorageEvent, Store, Stores};
