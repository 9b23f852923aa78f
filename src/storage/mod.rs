//! Storage Module
//!
//! Heap storage: one append-mostly data file per table.
//!
//! ## Responsibilities
//! - Append serialized tuples and hand back stable byte offsets
//! - Read a tuple back by offset
//! - Overwrite a tuple in place when it fits the original slot
//! - Know nothing about indices or the log
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ Slot 0 (offset 0)                                      │
//! │ ┌──────────────┬─────────┬─────────┬─────────────────┐ │
//! │ │ Capacity (4) │ Len (4) │ CRC (4) │ Tuple + padding │ │
//! │ └──────────────┴─────────┴─────────┴─────────────────┘ │
//! ├────────────────────────────────────────────────────────┤
//! │ Slot 1 (offset = SLOT_HEADER_SIZE + capacity)          │
//! │ ...                                                    │
//! └────────────────────────────────────────────────────────┘
//! ```
//! Every slot of a table has the same capacity (the table's
//! `max_tuple_size`). Removed tuples are never reclaimed; their slots
//! simply become unreachable once no index points at them.

mod heap;

pub use heap::{HeapFile, SLOT_HEADER_SIZE};
