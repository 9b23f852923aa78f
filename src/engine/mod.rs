//! Engine Module
//!
//! The WAL engine that coordinates the log, heap files and indices.
//!
//! ## Responsibilities
//! - Open one log and one heap file per table under `fs_path`
//! - Execute single-key statements: log first, then mutate heap + indices
//! - Run the group-commit thread while writable
//! - Rebuild indices by replaying the log (`recover`)

mod replay;

pub use replay::RecoveryStats;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::catalog::{tuple, Catalog, IndexDef, Record, TableDef};
use crate::config::Config;
use crate::error::{HeapWalError, Result};
use crate::index::OffsetIndex;
use crate::statement::Statement;
use crate::storage::HeapFile;
use crate::wal::{GroupCommitter, LogEntry, LogRecovery, LogWriter, OpType};

/// What a mutating statement did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State changed and a log entry was written
    Applied,
    /// Insert of a key that already exists; nothing changed
    Duplicate,
    /// Update/remove of a key that does not exist; nothing changed
    NotFound,
}

/// Result of `WalEngine::execute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementResult {
    /// Select: the projected row, or `None` when the key is absent
    Row(Option<String>),
    /// Insert/update/remove
    Write(Outcome),
}

/// Heap file and indices of one table, locked together
pub(crate) struct TableState {
    pub(crate) heap: HeapFile,
    /// Parallel to `TableDef::indices`
    pub(crate) indices: Vec<Box<dyn OffsetIndex>>,
}

/// The write-ahead-log storage engine
///
/// ## Concurrency Model
///
/// - Each table's heap and indices sit behind one mutex. A mutation holds it
///   from the log append through the last index update, so per table the
///   log order is exactly the apply order.
/// - The log has its own internal lock; statements on different tables only
///   contend there.
/// - The group-commit thread touches nothing but `LogWriter::sync`.
pub struct WalEngine {
    /// Engine configuration
    config: Config,

    /// Table definitions, indexed by table id
    catalog: Catalog,

    /// Read-only engines never open the log for writing
    read_only: bool,

    /// Location of the log, scanned by recovery
    log_path: PathBuf,

    /// Log writer, shared with the group-commit thread (`None` if read-only)
    log: Option<Arc<LogWriter>>,

    /// Per-table state, parallel to the catalog
    tables: Vec<Mutex<TableState>>,

    /// Background sync thread (`None` if read-only or shut down)
    group_commit: Option<GroupCommitter>,

    /// Set while the group-commit thread is meant to run
    ready: AtomicBool,

    closed: bool,
}

impl WalEngine {
    /// Open an engine over `catalog`
    ///
    /// On startup:
    /// 1. Create `fs_path` and open one heap file per table
    /// 2. Unless read-only: cut any torn log tail, open the log for append
    ///    and start the group-commit thread
    ///
    /// Indices start empty; call `recover` to rebuild them from the log.
    pub fn open(config: Config, catalog: Catalog, read_only: bool) -> Result<Self> {
        config.validate()?;
        catalog.validate()?;

        fs::create_dir_all(&config.fs_path)?;

        let truncate = config.truncate_on_open && !read_only;
        if config.truncate_on_open && read_only {
            warn!("truncate_on_open ignored for a read-only engine");
        }

        let mut tables = Vec::with_capacity(catalog.len());
        for def in catalog.tables() {
            let heap = HeapFile::open(&config.table_path(&def.name), def.max_tuple_size, truncate)?;
            let indices = def.indices.iter().map(|_| config.index_kind.build()).collect();
            tables.push(Mutex::new(TableState { heap, indices }));
        }

        let log_path = config.log_path();
        let (log, group_commit) = if read_only {
            (None, None)
        } else {
            if truncate {
                OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&log_path)?;
            } else {
                LogRecovery::repair(&log_path)?;
            }
            let log = Arc::new(LogWriter::open(&log_path)?);
            let group_commit = GroupCommitter::spawn(Arc::clone(&log), config.gc_interval())?;
            (Some(log), Some(group_commit))
        };

        info!(
            fs_path = %config.fs_path.display(),
            tables = catalog.len(),
            read_only,
            gc_interval_ms = config.gc_interval_ms,
            "Engine opened"
        );

        Ok(Self {
            ready: AtomicBool::new(!read_only),
            config,
            catalog,
            read_only,
            log_path,
            log,
            tables,
            group_commit,
            closed: false,
        })
    }

    /// Execute a statement
    ///
    /// Routes statements to the matching operation by op type
    pub fn execute(&self, statement: Statement) -> Result<StatementResult> {
        match statement.op_type {
            OpType::Select => self.select(statement).map(StatementResult::Row),
            OpType::Insert => self.insert(statement).map(StatementResult::Write),
            OpType::Update => self.update(statement).map(StatementResult::Write),
            OpType::Remove => self.remove(statement).map(StatementResult::Write),
        }
    }

    /// Look a key up through the statement's index
    ///
    /// Returns the requested projection of the stored tuple, or `None` when
    /// the index has no entry for the key.
    pub fn select(&self, statement: Statement) -> Result<Option<String>> {
        let Statement {
            table_id,
            table_index_id,
            record,
            projection,
            ..
        } = statement;

        let (def, table) = self.table(table_id)?;
        let index_def = def
            .indices
            .get(table_index_id as usize)
            .ok_or(HeapWalError::UnknownIndex {
                table_id,
                index_id: table_index_id,
            })?;
        let key = self.key_hash(&record, index_def);

        let bytes = {
            let mut state = table.lock();
            let Some(offset) = state.indices[table_index_id as usize].at(key) else {
                debug!(table_id, key, "Select: key not found");
                return Ok(None);
            };
            state.heap.at(offset)?
        };

        let row = tuple::deserialize_to_string(&into_tuple(bytes)?, &def.schema, &projection)?;
        debug!(table_id, key, "Select: hit");
        Ok(Some(row))
    }

    /// Insert a record
    ///
    /// Steps:
    /// 1. Hash the key through the primary index; an existing key is a no-op
    /// 2. Append the tuple to the log
    /// 3. Append the tuple to the heap
    /// 4. Point every index at the new slot
    pub fn insert(&self, statement: Statement) -> Result<Outcome> {
        let log = self.writable_log()?;
        let Statement {
            transaction_id,
            table_id,
            record,
            ..
        } = statement;

        let (def, table) = self.table(table_id)?;
        let after_tuple = tuple::serialize(&record, &def.schema)?;
        let key = self.key_hash(&record, def.primary_index());

        let mut state = table.lock();
        if state.indices[0].exists(key) {
            debug!(table_id, key, "Insert: duplicate key ignored");
            return Ok(Outcome::Duplicate);
        }

        // Reject oversize tuples before anything reaches the log.
        state
            .heap
            .check_fits(state.heap.end_offset(), after_tuple.len())
            .inspect_err(|e| warn!(table_id, error = %e, "Insert rejected"))?;

        let entry = LogEntry::new(transaction_id, OpType::Insert, table_id, after_tuple);
        log.append(&entry)?;

        let offset = state.heap.push_back(entry.payload.as_bytes())?;
        for (index_def, index) in def.indices.iter().zip(state.indices.iter_mut()) {
            index.insert(self.key_hash(&record, index_def), offset);
        }

        debug!(table_id, key, offset, "Insert applied");
        Ok(Outcome::Applied)
    }

    /// Overwrite fields of an existing tuple in place
    ///
    /// Only the after-image is logged. Key fields cannot be updated, so the
    /// indices never change; a tuple that no longer fits its slot is
    /// rejected before anything is logged.
    pub fn update(&self, statement: Statement) -> Result<Outcome> {
        let log = self.writable_log()?;
        let Statement {
            transaction_id,
            table_id,
            record,
            field_ids,
            ..
        } = statement;

        let (def, table) = self.table(table_id)?;
        record.check(&def.schema)?;
        for &field_id in &field_ids {
            if field_id >= def.schema.len() {
                return Err(HeapWalError::UnknownField { table_id, field_id });
            }
            if def.is_key_field(field_id) {
                return Err(HeapWalError::KeyFieldUpdate { table_id, field_id });
            }
        }
        let key = self.key_hash(&record, def.primary_index());

        let mut state = table.lock();
        let Some(offset) = state.indices[0].at(key) else {
            debug!(table_id, key, "Update: key not found");
            return Ok(Outcome::NotFound);
        };

        let mut image = tuple::deserialize_to_record(&into_tuple(state.heap.at(offset)?)?, &def.schema)?;
        for &field_id in &field_ids {
            image.set_from(field_id, &record);
        }
        let after_tuple = tuple::serialize(&image, &def.schema)?;

        state
            .heap
            .check_fits(offset, after_tuple.len())
            .inspect_err(|e| warn!(table_id, error = %e, "Update rejected"))?;

        let entry = LogEntry::new(transaction_id, OpType::Update, table_id, after_tuple);
        log.append(&entry)?;

        state.heap.update(offset, entry.payload.as_bytes())?;

        debug!(table_id, key, offset, "Update applied");
        Ok(Outcome::Applied)
    }

    /// Remove a tuple
    ///
    /// Logs the before-image, then erases the key from every index. The
    /// heap slot is left as it is (lazy deletion).
    pub fn remove(&self, statement: Statement) -> Result<Outcome> {
        let log = self.writable_log()?;
        let Statement {
            transaction_id,
            table_id,
            record,
            ..
        } = statement;

        let (def, table) = self.table(table_id)?;
        record.check(&def.schema)?;
        let key = self.key_hash(&record, def.primary_index());

        let mut state = table.lock();
        let Some(offset) = state.indices[0].at(key) else {
            debug!(table_id, key, "Remove: key not found");
            return Ok(Outcome::NotFound);
        };

        let before = tuple::deserialize_to_record(&into_tuple(state.heap.at(offset)?)?, &def.schema)?;
        let entry = LogEntry::new(
            transaction_id,
            OpType::Remove,
            table_id,
            tuple::serialize(&before, &def.schema)?,
        );
        log.append(&entry)?;

        for (index_def, index) in def.indices.iter().zip(state.indices.iter_mut()) {
            index.erase(self.key_hash(&before, index_def));
        }

        debug!(table_id, key, offset, "Remove applied");
        Ok(Outcome::Applied)
    }

    /// Every statement is its own transaction; kept for callers that bracket
    pub fn txn_begin(&self) {}

    /// See `txn_begin`
    pub fn txn_end(&self, _commit: bool) {}

    /// Close the engine gracefully
    ///
    /// Stops the group-commit thread, syncs and closes the log, then syncs
    /// and closes every heap file. Dropping the engine does the same but
    /// can only log failures.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether the group-commit thread is meant to be running
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Path of the log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Completed log syncs (0 for read-only engines)
    pub fn log_sync_count(&self) -> u64 {
        self.log.as_ref().map_or(0, |log| log.sync_count())
    }

    /// Entries appended to the log by this engine
    pub fn log_appended(&self) -> u64 {
        self.log.as_ref().map_or(0, |log| log.current_lsn() - 1)
    }

    /// Highest appended entry known durable
    pub fn log_synced(&self) -> u64 {
        self.log.as_ref().map_or(0, |log| log.synced_lsn())
    }

    /// Number of live tuples (primary index entries) in a table
    pub fn table_len(&self, table_id: u32) -> Result<usize> {
        self.index_len(table_id, 0)
    }

    /// Number of entries in one index
    pub fn index_len(&self, table_id: u32, index_id: u32) -> Result<usize> {
        let (_, table) = self.table(table_id)?;
        let state = table.lock();
        state
            .indices
            .get(index_id as usize)
            .map(|index| index.len())
            .ok_or(HeapWalError::UnknownIndex { table_id, index_id })
    }

    /// Offset the primary index holds for `key`
    pub fn offset_of(&self, table_id: u32, key: &Record) -> Result<Option<u64>> {
        let (def, table) = self.table(table_id)?;
        let hash = self.key_hash(key, def.primary_index());
        Ok(table.lock().indices[0].at(hash))
    }

    /// Slots ever written to a table's heap file, live or not
    pub fn heap_slot_count(&self, table_id: u32) -> Result<u64> {
        let (_, table) = self.table(table_id)?;
        let slots = table.lock().heap.slot_count();
        Ok(slots)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn table(&self, table_id: u32) -> Result<(&TableDef, &Mutex<TableState>)> {
        let def = self.catalog.table(table_id)?;
        let state = self
            .tables
            .get(table_id as usize)
            .ok_or(HeapWalError::UnknownTable(table_id))?;
        Ok((def, state))
    }

    fn writable_log(&self) -> Result<&LogWriter> {
        self.log.as_deref().ok_or(HeapWalError::ReadOnly)
    }

    fn key_hash(&self, record: &Record, index: &IndexDef) -> u64 {
        (self.config.key_hasher)(&record.key_string(index))
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.ready.store(false, Ordering::Release);

        if let Some(group_commit) = self.group_commit.take() {
            let stats = group_commit.stop();
            debug!(syncs = stats.syncs, failures = stats.failures, "Group commit joined");
        }

        let mut first_error = None;
        if let Some(log) = &self.log {
            if let Err(e) = log.close() {
                first_error.get_or_insert(e);
            }
        }
        for table in &self.tables {
            if let Err(e) = table.lock().heap.close() {
                first_error.get_or_insert(e);
            }
        }

        info!(fs_path = %self.config.fs_path.display(), "Engine closed");
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for WalEngine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "Engine shutdown failed");
        }
    }
}

fn into_tuple(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| HeapWalError::Serialization(format!("Tuple is not valid UTF-8: {}", e)))
}
