//! Store configuration.
//!
//! # Responsibility
//! - Describe where the store keeps its durable records.
//!
//! # Invariants
//! - `StorageLocation::InMemory` data never outlives the store instance.

use std::path::{Path, PathBuf};

/// Default database file name used when callers provide no path.
pub const DEFAULT_DB_FILE_NAME: &str = "todos.sqlite3";

/// Backing location for the todo database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// SQLite file, created on first open.
    File(PathBuf),
    /// Private in-memory SQLite database.
    InMemory,
}

/// Construction-time configuration for `TodoStore::open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub storage: StorageLocation,
}

impl StoreConfig {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            storage: StorageLocation::File(path.as_ref().to_path_buf()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            storage: StorageLocation::InMemory,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::file(DEFAULT_DB_FILE_NAME)
    }
}
