//! WAL Writer
//!
//! Handles appending records to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;

use super::{Operation, WalEntry};

/// Writes records to the WAL file
pub struct WalWriter {
    /// Buffered file writer (batches frame bytes until `sync`)
    file: BufWriter<File>,

    /// Next LSN to assign
    next_lsn: u64,
}

impl WalWriter {
    /// Open or create a WAL file in append mode.
    ///
    /// Existing content is preserved: after a crash the caller replays the
    /// file first and seeds `next_lsn` past the last replayed record, so new
    /// records continue the sequence behind the ones awaiting flush.
    pub fn open(path: &Path, next_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file: BufWriter::new(file),
            next_lsn,
        })
    }

    /// Append a record to the WAL buffer.
    ///
    /// Returns the LSN assigned to the record. The record is not durable
    /// until `sync` returns; the engine calls `sync` before acknowledging
    /// a write (once per operation, or once per batch).
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.next_lsn;
        self.next_lsn += 1;

        let frame = WalEntry::new(lsn, operation).encode();
        self.file.write_all(&frame)?;

        Ok(lsn)
    }

    /// Force all appended records to stable storage (flush + fsync).
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        Ok(())
    }

    /// Truncate the WAL to zero length.
    ///
    /// Called after a successful flush, once every record's effect is durable
    /// in an SSTable. The LSN counter is not reset: sequence numbers stay
    /// strictly increasing for the lifetime of the engine instance.
    pub fn truncate(&mut self) -> Result<()> {
        // Empty the buffer first so no stale frame bytes land after set_len.
        self.file.flush()?;

        let file = self.file.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;

        Ok(())
    }

    /// Next LSN to be assigned
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn
    }
}
