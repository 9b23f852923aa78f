//! # heapwal
//!
//! A single-node write-ahead-log storage engine with:
//! - An append-only log written before every mutation
//! - Group commit: a background thread fsyncs the log on a fixed cadence
//! - Heap files of fixed-capacity slots addressed by byte offset
//! - Hash indices from key hash to heap offset, with lazy deletion
//! - Redo recovery that rebuilds the indices by replaying the log
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Statements (CRUD)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      WalEngine                              │
//! │              (one lock per table)                           │
//! └──────┬──────────────────────┬───────────────────┬───────────┘
//!        │ 1. append            │ 2. push/update    │ 3. insert/erase
//!        ▼                      ▼                   ▼
//!   ┌─────────────┐      ┌─────────────┐     ┌─────────────┐
//!   │     Log     │      │  HeapFile   │     │   Indices   │
//!   │  (append)   │      │ (per table) │     │ hash → off  │
//!   └──────▲──────┘      └─────────────┘     └─────────────┘
//!          │ sync every gc_interval
//!   ┌──────┴──────┐
//!   │ GroupCommit │
//!   │   thread    │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod catalog;
pub mod engine;
pub mod index;
pub mod statement;
pub mod storage;
pub mod wal;
pub mod workload;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use catalog::{Catalog, FieldType, IndexDef, Record, Schema, TableDef, Value};
pub use config::Config;
pub use engine::{Outcome, RecoveryStats, StatementResult, WalEngine};
pub use error::{HeapWalError, Result};
pub use statement::{PartitionType, Projection, Statement};
pub use wal::OpType;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of heapwal
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
