//! Configuration for heapwal
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HeapWalError, Result};
use crate::index::{hash_key, IndexKind};

/// Signature of the function that turns a key projection into an index key.
pub type KeyHasher = fn(&str) -> u64;

/// Main configuration for a heapwal engine
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Base directory for the log and the heap files
    /// Internal structure:
    ///   {fs_path}/
    ///     ├── log              (write-ahead log)
    ///     └── {table_name}     (one heap file per table)
    pub fs_path: PathBuf,

    /// Start from empty heap files and an empty log
    pub truncate_on_open: bool,

    // -------------------------------------------------------------------------
    // Group Commit Configuration
    // -------------------------------------------------------------------------
    /// Milliseconds between forced log syncs
    pub gc_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Backing structure used for every index
    pub index_kind: IndexKind,

    /// Hash applied to key projections. Collisions are not resolved:
    /// two keys with the same hash share one index slot.
    pub key_hasher: KeyHasher,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fs_path: PathBuf::from("./heapwal_data"),
            truncate_on_open: false,
            gc_interval_ms: 5,
            index_kind: IndexKind::Hash,
            key_hasher: hash_key,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Group-commit period as a `Duration`
    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }

    /// Path of the write-ahead log
    pub fn log_path(&self) -> PathBuf {
        self.fs_path.join("log")
    }

    /// Path of the heap file backing `table_name`
    pub fn table_path(&self, table_name: &str) -> PathBuf {
        self.fs_path.join(table_name)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.fs_path.as_os_str().is_empty() {
            return Err(HeapWalError::Config("fs_path must not be empty".to_string()));
        }
        if self.gc_interval_ms == 0 {
            return Err(HeapWalError::Config(
                "gc_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the base directory for log and heap files
    pub fn fs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.fs_path = path.into();
        self
    }

    /// Set the group-commit interval (in milliseconds)
    pub fn gc_interval_ms(mut self, ms: u64) -> Self {
        self.config.gc_interval_ms = ms;
        self
    }

    /// Set the index backing structure
    pub fn index_kind(mut self, kind: IndexKind) -> Self {
        self.config.index_kind = kind;
        self
    }

    /// Set the key hash function
    pub fn key_hasher(mut self, hasher: KeyHasher) -> Self {
        self.config.key_hasher = hasher;
        self
    }

    /// Truncate heap files and log when the engine opens
    pub fn truncate_on_open(mut self, truncate: bool) -> Self {
        self.config.truncate_on_open = truncate;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
