//! Log Writer
//!
//! Handles appending entries to the log file.
//!
//! The writer is shared between foreground statements (append) and the
//! group-commit thread (sync). Appends are serialized by an internal mutex
//! and each line is handed to the OS before `append` returns, so a heap
//! write that follows an append can never reach the file system ahead of
//! its log line. Only the fsync is deferred: `sync` fsyncs through a second
//! handle without holding the append lock.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{HeapWalError, Result};

use super::LogEntry;

/// Appends entries to the log file
pub struct LogWriter {
    /// Log file location (read back by recovery)
    path: PathBuf,
    /// Buffered append handle, guarded for concurrent callers
    inner: Mutex<WriterState>,
    /// Second handle on the same file, used for fsync
    sync_handle: File,
    /// Highest sequence number known durable
    synced_lsn: AtomicU64,
    /// Completed syncs
    sync_count: AtomicU64,
}

struct WriterState {
    writer: BufWriter<File>,
    /// Sequence number of the next appended entry (1-based, per writer)
    next_lsn: u64,
    closed: bool,
}

impl LogWriter {
    /// Open or create a log file for appending
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let sync_handle = file.try_clone()?;

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(WriterState {
                writer: BufWriter::new(file),
                next_lsn: 1,
                closed: false,
            }),
            sync_handle,
            synced_lsn: AtomicU64::new(0),
            sync_count: AtomicU64::new(0),
        })
    }

    /// Append an entry, returning its sequence number
    ///
    /// The line is written through to the OS page cache; durability waits
    /// for the next `sync`.
    pub fn append(&self, entry: &LogEntry) -> Result<u64> {
        let line = entry.encode()?;

        let mut state = self.inner.lock();
        if state.closed {
            return Err(HeapWalError::LogWrite("Log is closed".to_string()));
        }
        state.writer.write_all(line.as_bytes())?;
        state.writer.flush()?;

        let lsn = state.next_lsn;
        state.next_lsn += 1;
        Ok(lsn)
    }

    /// Force every entry appended so far to durable storage
    pub fn sync(&self) -> Result<()> {
        let target = {
            let mut state = self.inner.lock();
            state.writer.flush()?;
            state.next_lsn - 1
        };

        self.sync_handle.sync_data()?;

        self.synced_lsn.fetch_max(target, Ordering::AcqRel);
        self.sync_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Sync and refuse further appends
    pub fn close(&self) -> Result<()> {
        self.sync()?;
        self.inner.lock().closed = true;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number the next append will get
    pub fn current_lsn(&self) -> u64 {
        self.inner.lock().next_lsn
    }

    /// Highest sequence number covered by a completed sync
    pub fn synced_lsn(&self) -> u64 {
        self.synced_lsn.load(Ordering::Acquire)
    }

    /// Number of completed syncs
    pub fn sync_count(&self) -> u64 {
        self.sync_count.load(Ordering::Acquire)
    }
}
