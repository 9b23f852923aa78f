//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append one entry per mutating statement before heap/index mutation
//! - Periodic group commit (fsync) on a background thread
//! - Sequential scan for redo recovery, discarding a torn tail
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ <txn_id> <op_code> <table_id> <tuple payload ...>\n      │
//! │ <txn_id> <op_code> <table_id> <tuple payload ...>\n      │
//! │ ...                                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//! Op codes: 1 = insert (new tuple), 2 = update (after-image),
//! 3 = remove (before-image). Selects are never logged.

mod entry;
mod group_commit;
mod reader;
mod recovery;
mod writer;

pub use entry::{LogEntry, OpType};
pub use group_commit::{GroupCommitStats, GroupCommitter};
pub use reader::{LogIterator, LogReader};
pub use recovery::{LogRecovery, RecoveryResult};
pub use writer::LogWriter;
