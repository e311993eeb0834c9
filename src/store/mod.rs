//! Store engine over a backend surface.
//!
//! - [`Store`] - envelope serialization, lazy expiry, change events
//! - [`Stores`] - the local/session pair built at startup
//! - [`Envelope`] - the persisted `{"v", "e"}` record

mod envelope;
mod store;
mod stores;
mod types;


pub use envelope::Envelope;
pub use store::Store;
pub use stores::Stores;
pub use types::{Diagnostic, SetOptions, StorageEvent};
