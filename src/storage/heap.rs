//! Heap File
//!
//! Fixed-capacity slot file addressed by byte offset.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{HeapWalError, Result};

/// Slot header: Capacity (4) + Len (4) + CRC (4) = 12 bytes
pub const SLOT_HEADER_SIZE: u64 = 12;

/// A table's heap file
pub struct HeapFile {
    /// File location
    path: PathBuf,
    /// Open handle, `None` after `close`
    file: Option<File>,
    /// Tuple bytes per slot
    capacity: usize,
    /// Offset the next `push_back` writes to
    end_offset: u64,
}

impl HeapFile {
    /// Open or create a heap file whose slots hold up to `max_tuple_size` bytes
    ///
    /// With `truncate`, existing contents are discarded. Otherwise a trailing
    /// partial slot left by an interrupted append is cut off.
    pub fn open(path: &Path, max_tuple_size: usize, truncate: bool) -> Result<Self> {
        if max_tuple_size == 0 || max_tuple_size > u32::MAX as usize {
            return Err(HeapWalError::Storage(format!(
                "Invalid slot capacity {} for {}",
                max_tuple_size,
                path.display()
            )));
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(truncate)
            .open(path)?;

        let slot_size = SLOT_HEADER_SIZE + max_tuple_size as u64;
        let file_len = file.metadata()?.len();
        let end_offset = file_len - file_len % slot_size;

        if end_offset != file_len {
            warn!(
                path = %path.display(),
                file_len,
                end_offset,
                "Discarding partial heap slot"
            );
            file.set_len(end_offset)?;
        }

        debug!(path = %path.display(), slots = end_offset / slot_size, "Opened heap file");

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            capacity: max_tuple_size,
            end_offset,
        })
    }

    /// Append a tuple, returning the offset of its slot
    pub fn push_back(&mut self, tuple: &[u8]) -> Result<u64> {
        let offset = self.end_offset;
        self.check_fits(offset, tuple.len())?;

        let slot = self.encode_slot(tuple);
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&slot)?;

        self.end_offset += slot.len() as u64;
        Ok(offset)
    }

    /// Read the tuple stored at `offset`
    pub fn at(&mut self, offset: u64) -> Result<Vec<u8>> {
        self.check_offset(offset)?;
        let capacity = self.capacity;
        let file = self.file_mut()?;

        let mut header = [0u8; SLOT_HEADER_SIZE as usize];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut header)?;

        let slot_capacity = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let crc = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);

        if slot_capacity != capacity || len > capacity {
            return Err(HeapWalError::Storage(format!(
                "Corrupt slot header at offset {}: capacity {}, len {}",
                offset, slot_capacity, len
            )));
        }

        let mut tuple = vec![0u8; len];
        file.read_exact(&mut tuple)?;

        if crc32fast::hash(&tuple) != crc {
            return Err(HeapWalError::Storage(format!(
                "Checksum mismatch at offset {}",
                offset
            )));
        }

        Ok(tuple)
    }

    /// Overwrite the tuple at `offset` in place
    ///
    /// Fails with `CapacityExceeded` when the tuple does not fit the slot;
    /// nothing is written in that case.
    pub fn update(&mut self, offset: u64, tuple: &[u8]) -> Result<()> {
        self.check_offset(offset)?;
        self.check_fits(offset, tuple.len())?;

        let slot = self.encode_slot(tuple);
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&slot)?;
        Ok(())
    }

    /// Reject tuples larger than the slot capacity
    pub fn check_fits(&self, offset: u64, len: usize) -> Result<()> {
        if len > self.capacity {
            return Err(HeapWalError::CapacityExceeded {
                offset,
                capacity: self.capacity,
                len,
            });
        }
        Ok(())
    }

    /// Force written slots to durable storage
    pub fn sync(&mut self) -> Result<()> {
        let file = self.file_mut()?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }

    /// Sync and release the file handle; later calls fail
    pub fn close(&mut self) -> Result<()> {
        if self.file.is_some() {
            self.sync()?;
            self.file = None;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tuple bytes per slot
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per slot including the header
    pub fn slot_size(&self) -> u64 {
        SLOT_HEADER_SIZE + self.capacity as u64
    }

    /// Offset one past the last slot
    pub fn end_offset(&self) -> u64 {
        self.end_offset
    }

    pub fn slot_count(&self) -> u64 {
        self.end_offset / self.slot_size()
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn file_mut(&mut self) -> Result<&mut File> {
        let path = &self.path;
        self.file.as_mut().ok_or_else(|| {
            HeapWalError::Storage(format!("Heap file {} is closed", path.display()))
        })
    }

    fn check_offset(&self, offset: u64) -> Result<()> {
        if offset >= self.end_offset || offset % self.slot_size() != 0 {
            return Err(HeapWalError::Storage(format!(
                "Offset {} is not a slot of {} (end {})",
                offset,
                self.path.display(),
                self.end_offset
            )));
        }
        Ok(())
    }

    /// [capacity][len][crc][tuple][zero padding]
    fn encode_slot(&self, tuple: &[u8]) -> Vec<u8> {
        let mut slot = Vec::with_capacity(self.slot_size() as usize);
        slot.extend_from_slice(&(self.capacity as u32).to_le_bytes());
        slot.extend_from_slice(&(tuple.len() as u32).to_le_bytes());
        slot.extend_from_slice(&crc32fast::hash(tuple).to_le_bytes());
        slot.extend_from_slice(tuple);
        slot.resize(self.slot_size() as usize, 0);
        slot
    }
}
