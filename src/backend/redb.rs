//! Redb-backed storage surface.
//!
//! Durable key-value surface in a single redb file. Values are the raw
//! envelope strings; expiry is interpreted by the store, not here.

use super::StorageBackend;
use crate::error::Result;
use anyhow::Context;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Table holding raw envelope strings.
pub(crate) const ENTRIES_TABLE: TableDefinition<'static, &'static str, &'static str> =
    TableDefinition::new("entries");

/// Redb-backed storage surface.
///
/// Enumeration order is the table's key order. `RedbBackend` is `Clone`;
/// clones share the same database handle.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Opens or creates a redb database at the given path.
    ///
    /// Creates parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened or created (permissions, locked by
    ///   another process, etc.)
    /// - Initialization transaction fails to begin or commit
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create storage directory: {}", parent.display()))?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open storage database: {}", path.display()))?;

        // Create the table up front so read transactions can always open it
        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            let _table = write_txn
                .open_table(ENTRIES_TABLE)
                .context("Failed to initialize entries table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get_sync(&self, key: &str) -> anyhow::Result<Option<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(ENTRIES_TABLE)
            .context("Failed to open entries table")?;

        let value = table
            .get(key)
            .with_context(|| format!("Failed to read key '{key}'"))?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn count_sync(&self) -> anyhow::Result<usize> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(ENTRIES_TABLE)
            .context("Failed to open entries table")?;

        let len = table.len().context("Failed to count entries")?;
        Ok(usize::try_from(len).unwrap_or(usize::MAX))
    }

    fn key_at_sync(&self, index: usize) -> anyhow::Result<Option<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(ENTRIES_TABLE)
            .context("Failed to open entries table")?;

        let entry = table
            .iter()
            .context("Failed to iterate entries table")?
            .nth(index);
        match entry {
            Some(item) => {
                let (key, _) = item.context("Failed to read entry")?;
                Ok(Some(key.value().to_string()))
            },
            None => Ok(None),
        }
    }

    fn all_keys_sync(&self) -> anyhow::Result<Vec<String>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(ENTRIES_TABLE)
            .context("Failed to open entries table")?;

        let mut keys = Vec::new();
        for item in table.iter().context("Failed to iterate entries table")? {
            let (key, _) = item.context("Failed to read entry")?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

impl StorageBackend for RedbBackend {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.get_sync(key).unwrap_or_else(|err| {
            debug!(key, error = %err, "Read failed, treating key as absent");
            None
        })
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(ENTRIES_TABLE)
                .context("Failed to open entries table")?;
            table
                .insert(key, value)
                .with_context(|| format!("Failed to insert key '{key}'"))?;
        }
        write_txn
            .commit()
            .context("Failed to commit set transaction")?;
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(ENTRIES_TABLE)
                .context("Failed to open entries table")?;
            table
                .remove(key)
                .with_context(|| format!("Failed to remove key '{key}'"))?;
        }
        write_txn
            .commit()
            .context("Failed to commit remove transaction")?;
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(ENTRIES_TABLE)
                .context("Failed to open entries table")?;
            table
                .retain(|_, _| false)
                .context("Failed to clear entries table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit clear transaction")?;
        Ok(())
    }

    fn count(&self) -> usize {
        self.count_sync().unwrap_or_else(|err| {
            debug!(error = %err, "Count failed, reporting empty surface");
            0
        })
    }

    fn key_at(&self, index: usize) -> Option<String> {
        self.key_at_sync(index).unwrap_or_else(|err| {
            debug!(index, error = %err, "Enumeration failed");
            None
        })
    }

    fn all_keys(&self) -> Vec<String> {
        self.all_keys_sync().unwrap_or_else(|err| {
            debug!(error = %err, "Enumeration failed, reporting empty surface");
            Vec::new()
        })
    }
}
