//! Shared defaults.

/// Delimiter between a namespace prefix and a key.
pub const DEFAULT_DELIMITER: &str = ":";

/// Default per-area quota for memory surfaces (5 MiB).
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Default number of undelivered cross-context signals buffered per context.
pub const DEFAULT_SIGNAL_CAPACITY: usize = 256;
