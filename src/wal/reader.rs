//! Log Reader
//!
//! Handles reading entries from the log file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{HeapWalError, Result};

use super::LogEntry;

/// Reads entries from the log file, front to back
pub struct LogReader {
    reader: BufReader<File>,
    /// Byte offset just past the last entry returned
    position: u64,
    /// Reusable line buffer
    line: Vec<u8>,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            line: Vec::new(),
        })
    }

    /// Read the next entry from the log
    ///
    /// Returns `Ok(None)` at a clean end of file. A final line without its
    /// newline (torn append) or a line that does not parse yields
    /// `LogCorruption`; `position()` still points at the end of the last
    /// good entry.
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        self.line.clear();
        let read = self.reader.read_until(b'\n', &mut self.line)?;
        if read == 0 {
            return Ok(None);
        }

        if self.line.last() != Some(&b'\n') {
            return Err(HeapWalError::LogCorruption(format!(
                "Torn entry of {} bytes at offset {}",
                read, self.position
            )));
        }

        let text = std::str::from_utf8(&self.line[..read - 1]).map_err(|e| {
            HeapWalError::LogCorruption(format!("Invalid UTF-8 at offset {}: {}", self.position, e))
        })?;
        let entry = LogEntry::parse(text)?;

        self.position += read as u64;
        Ok(Some(entry))
    }

    /// Byte offset just past the last entry successfully read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> LogIterator {
        LogIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over log entries; ends after the first error
pub struct LogIterator {
    reader: LogReader,
    done: bool,
}

impl Iterator for LogIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
