//! Redo recovery
//!
//! Rebuilds every index by replaying the log front to back against the heap
//! files the engine was opened on.
//!
//! - Insert: find the tuple's slot in the existing heap (or append it when
//!   the crash hit between the log append and the heap append), then point
//!   every index at it.
//! - Remove: erase the before-image's keys from every index.
//! - Update: rewrite the after-image into the slot the primary index points
//!   at, covering a crash between the log append and the in-place write.
//!
//! Replay stops at the first entry it cannot decode; later entries are not
//! applied.

use tracing::{info, warn};

use crate::catalog::{tuple, Record, TableDef};
use crate::error::{HeapWalError, Result};
use crate::wal::{LogRecovery, OpType, RecoveryResult};

use super::{into_tuple, TableState, WalEngine};

/// Outcome of `WalEngine::recover`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Log scan result (intact entries, discarded tail)
    pub log: RecoveryResult,
    /// Insert entries replayed
    pub inserts: u64,
    /// Update entries replayed
    pub updates: u64,
    /// Remove entries replayed
    pub removes: u64,
    /// Inserts whose tuple was missing from the heap and had to be appended
    pub heap_appends: u64,
    /// Updates whose key was not indexed at that point of the log
    pub skipped: u64,
    /// Intact log lines not applied because an earlier entry failed to decode
    pub entries_discarded: u64,
}

/// Walks the heap slots that existed before replay started
struct SlotCursor {
    next: u64,
    limit: u64,
}

impl WalEngine {
    /// Rebuild all indices from the log
    ///
    /// Indices are cleared first, so calling this again yields the same
    /// state. Works on read-only engines: only heap files are written. On a
    /// writable engine the log is synced first so the scan sees every
    /// appended entry; statements must not run concurrently with recovery.
    pub fn recover(&self) -> Result<RecoveryStats> {
        if let Some(log) = &self.log {
            log.sync()?;
        }

        let (entries, log_result) = LogRecovery::scan(&self.log_path)?;
        let mut stats = RecoveryStats {
            log: log_result,
            ..RecoveryStats::default()
        };

        let mut cursors: Vec<SlotCursor> = self
            .tables
            .iter()
            .map(|table| {
                let mut state = table.lock();
                state.indices.iter_mut().for_each(|index| index.clear());
                SlotCursor {
                    next: 0,
                    limit: state.heap.end_offset(),
                }
            })
            .collect();

        let total = entries.len() as u64;
        for (position, entry) in entries.into_iter().enumerate() {
            let decoded = self.table(entry.table_id).and_then(|(def, table)| {
                tuple::deserialize_to_record(&entry.payload, &def.schema).map(|record| (def, table, record))
            });
            let (def, table, record) = match decoded {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(
                        txn_id = entry.transaction_id,
                        table_id = entry.table_id,
                        error = %e,
                        "Stopping replay at undecodable entry"
                    );
                    stats.entries_discarded = total - position as u64;
                    break;
                }
            };

            let mut state = table.lock();
            match entry.op_type {
                OpType::Insert => {
                    let cursor = &mut cursors[entry.table_id as usize];
                    if self.redo_insert(def, &mut state, cursor, &record, &entry.payload)? {
                        stats.heap_appends += 1;
                    }
                    stats.inserts += 1;
                }
                OpType::Remove => {
                    for (index_def, index) in def.indices.iter().zip(state.indices.iter_mut()) {
                        index.erase(self.key_hash(&record, index_def));
                    }
                    stats.removes += 1;
                }
                OpType::Update => {
                    let key = self.key_hash(&record, def.primary_index());
                    match state.indices[0].at(key) {
                        Some(offset) => {
                            state.heap.update(offset, entry.payload.as_bytes())?;
                            for (index_def, index) in def.indices.iter().zip(state.indices.iter_mut()) {
                                index.insert(self.key_hash(&record, index_def), offset);
                            }
                            stats.updates += 1;
                        }
                        None => {
                            warn!(txn_id = entry.transaction_id, key, "Update of unindexed key skipped");
                            stats.skipped += 1;
                        }
                    }
                }
                OpType::Select => stats.skipped += 1,
            }
        }

        info!(
            entries = stats.log.entries_recovered,
            inserts = stats.inserts,
            updates = stats.updates,
            removes = stats.removes,
            heap_appends = stats.heap_appends,
            discarded = stats.entries_discarded,
            tail_truncated = stats.log.was_truncated,
            "Recovery complete"
        );
        Ok(stats)
    }

    /// Locate or materialize an inserted tuple and index it.
    /// Returns whether the tuple had to be appended to the heap.
    ///
    /// Slots are searched from the cursor. Slots holding another key (left by
    /// an append that never reached the log) are stepped over; the cursor
    /// only moves past a slot once a logged insert claims it.
    fn redo_insert(
        &self,
        def: &TableDef,
        state: &mut TableState,
        cursor: &mut SlotCursor,
        record: &Record,
        tuple: &str,
    ) -> Result<bool> {
        let primary = def.primary_index();
        let key = record.key_string(primary);
        let slot_size = state.heap.slot_size();
        let mut offset = None;

        let mut candidate = cursor.next;
        while candidate < cursor.limit {
            match state.heap.at(candidate) {
                Ok(bytes) => {
                    // Key fields never change, so a later update cannot hide the match.
                    let same_key = into_tuple(bytes.clone())
                        .and_then(|t| tuple::deserialize_to_record(&t, &def.schema))
                        .is_ok_and(|stored| stored.key_string(primary) == key);
                    if same_key {
                        if bytes != tuple.as_bytes() {
                            state.heap.update(candidate, tuple.as_bytes())?;
                        }
                        offset = Some(candidate);
                        break;
                    }
                    warn!(offset = candidate, table = %def.name, "Skipping heap slot with unlogged key");
                }
                Err(HeapWalError::Storage(reason)) if candidate == cursor.next => {
                    warn!(offset = candidate, table = %def.name, %reason, "Rewriting damaged heap slot");
                    state.heap.update(candidate, tuple.as_bytes())?;
                    offset = Some(candidate);
                    break;
                }
                Err(HeapWalError::Storage(reason)) => {
                    warn!(offset = candidate, table = %def.name, %reason, "Skipping damaged heap slot");
                }
                Err(e) => return Err(e),
            }
            candidate += slot_size;
        }

        if let Some(found) = offset {
            cursor.next = found + slot_size;
        }

        let appended = offset.is_none();
        let offset = match offset {
            Some(offset) => offset,
            None => state.heap.push_back(tuple.as_bytes())?,
        };

        for (index_def, index) in def.indices.iter().zip(state.indices.iter_mut()) {
            index.insert(self.key_hash(record, index_def), offset);
        }
        Ok(appended)
    }
}
