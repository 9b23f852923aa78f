//! Error types for heapwal
//!
//! Provides a unified error type for all operations.
//!
//! Missing keys and duplicate inserts are not errors: they are reported
//! through `Option` / `Outcome` values by the engine.

use thiserror::Error;

/// Result type alias using HeapWalError
pub type Result<T> = std::result::Result<T, HeapWalError>;

/// Unified error type for heapwal operations
#[derive(Debug, Error)]
pub enum HeapWalError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("Log corruption detected: {0}")]
    LogCorruption(String),

    #[error("Log write failed: {0}")]
    LogWrite(String),

    // -------------------------------------------------------------------------
    // Heap Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Tuple of {len} bytes exceeds slot capacity {capacity} at offset {offset}")]
    CapacityExceeded { offset: u64, capacity: usize, len: usize },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Catalog Errors
    // -------------------------------------------------------------------------
    #[error("Unknown table id {0}")]
    UnknownTable(u32),

    #[error("Unknown index {index_id} on table {table_id}")]
    UnknownIndex { table_id: u32, index_id: u32 },

    #[error("Unknown field {field_id} on table {table_id}")]
    UnknownField { table_id: u32, field_id: usize },

    #[error("Field {field_id} of table {table_id} is part of an index key and cannot be updated")]
    KeyFieldUpdate { table_id: u32, field_id: usize },

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine is read-only")]
    ReadOnly,
}
