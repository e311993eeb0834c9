//! Error types for storage operations.
//!
//! Public store operations degrade silently and never return these. They
//! surface through the `try_*` operations, backend implementations and
//! configuration loading.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Storage errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Value could not be encoded as JSON.
    #[error("failed to serialize value for '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Write rejected because the surface is full.
    #[error("quota exceeded writing '{key}': {needed} bytes needed, limit is {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// The host refused access to the surface.
    #[error("storage area unavailable: {0}")]
    Unavailable(String),

    /// Underlying surface failure.
    #[error("backend error: {0:#}")]
    Backend(#[from] anyhow::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a serialization error for the given key.
    pub fn serialization(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            key: key.into(),
            source,
        }
    }

    /// Create a quota exceeded error.
    pub fn quota_exceeded(key: impl Into<String>, needed: usize, limit: usize) -> Self {
        Self::QuotaExceeded {
            key: key.into(),
            needed,
            limit,
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Returns true if this error was caused by a full surface.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
