//! Log Recovery
//!
//! Scans the log after a crash and separates the intact prefix from a
//! torn or malformed tail.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{HeapWalError, Result};

use super::{LogEntry, LogReader};

/// Scans and repairs log files
pub struct LogRecovery;

/// Result of a log scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of intact entries, in log order
    pub entries_recovered: u64,

    /// Bytes after the last intact entry that were not applied
    pub bytes_discarded: u64,

    /// Transaction id of the last intact entry
    pub last_txn_id: u64,

    /// Whether a torn/malformed tail was found (and, when repairing, cut off)
    pub was_truncated: bool,
}

impl LogRecovery {
    /// Read every intact entry of a log file without modifying it
    ///
    /// Stops at the first torn or malformed line; everything from there on
    /// is reported as discarded. A missing file is an empty log.
    pub fn scan(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let mut result = RecoveryResult::default();
        let mut entries = Vec::new();

        if !path.exists() {
            return Ok((entries, result));
        }

        let file_len = std::fs::metadata(path)?.len();
        let mut reader = LogReader::open(path)?;

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.entries_recovered += 1;
                    result.last_txn_id = entry.transaction_id;
                    entries.push(entry);
                }
                Ok(None) => break,
                Err(HeapWalError::LogCorruption(reason)) => {
                    warn!(
                        path = %path.display(),
                        offset = reader.position(),
                        %reason,
                        "Discarding log tail"
                    );
                    result.was_truncated = true;
                    result.bytes_discarded = file_len.saturating_sub(reader.position());
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((entries, result))
    }

    /// Cut a torn or malformed tail off the log so new appends start on a
    /// clean line boundary
    pub fn repair(path: &Path) -> Result<RecoveryResult> {
        let (_, result) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            let valid_len = file.metadata()?.len() - result.bytes_discarded;
            file.set_len(valid_len)?;
            file.sync_all()?;
            info!(
                path = %path.display(),
                valid_len,
                bytes_discarded = result.bytes_discarded,
                "Truncated log tail"
            );
        }

        Ok(result)
    }
}
