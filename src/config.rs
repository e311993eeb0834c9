//! Store configuration loaded from TOML.
//!
//! ```toml
//! local_path = "data/local.redb"
//! quota_bytes = 5242880
//! signal_capacity = 256
//! delimiter = ":"
//! ```
//!
//! Every field is optional; omitted fields take the defaults in
//! [`crate::constants`].

use crate::backend::MemoryBackend;
use crate::constants;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Configuration for the host surfaces and stores.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// redb file backing the local-scope surface. Memory when absent.
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    /// Byte quota for memory surfaces. `0` disables the quota.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: usize,
    /// Cross-context signals buffered per context before lagging.
    #[serde(default = "default_signal_capacity")]
    pub signal_capacity: usize,
    /// Namespace delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_quota_bytes() -> usize {
    constants::DEFAULT_QUOTA_BYTES
}

fn default_signal_capacity() -> usize {
    constants::DEFAULT_SIGNAL_CAPACITY
}

fn default_delimiter() -> String {
    constants::DEFAULT_DELIMITER.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            local_path: None,
            quota_bytes: default_quota_bytes(),
            signal_capacity: default_signal_capacity(),
            delimiter: default_delimiter(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types or are unknown
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            Error::Config(format!("failed to read config file {}: {err}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|err| Error::Config(format!("failed to parse config file {}: {err}", path.display())))
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Validate configuration.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `signal_capacity` is 0
    /// - `delimiter` is empty
    /// - `local_path` points at a directory
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.signal_capacity == 0 {
            errors.push("signal_capacity cannot be 0".to_string());
        }

        if self.delimiter.is_empty() {
            errors.push("delimiter cannot be empty".to_string());
        }

        if self.quota_bytes == 0 {
            warnings.push(
                "quota_bytes is 0: memory surfaces are unlimited and writes never hit a quota"
                    .to_string(),
            );
        }

        if let Some(path) = &self.local_path
            && path.is_dir()
        {
            errors.push(format!(
                "local_path is a directory: {}\n  Expected a redb database file path",
                path.display()
            ));
        }

        if !errors.is_empty() {
            return Err(Error::Config(format!(
                "validation failed:\n  - {}",
                errors.join("\n  - ")
            )));
        }

        Ok(ValidationResult { warnings })
    }

    /// Memory surface honoring the configured quota.
    pub fn memory_surface(&self) -> MemoryBackend {
        if self.quota_bytes == 0 {
            MemoryBackend::new()
        } else {
            MemoryBackend::with_quota(self.quota_bytes)
        }
    }
}
