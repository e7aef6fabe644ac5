//! WAL Reader
//!
//! Reads records from the WAL file sequentially.
//!
//! Used during recovery to replay records from the WAL back into the
//! memtable. A record is yielded only if its full frame is present and its
//! checksum matches; the first short or mismatching frame ends iteration
//! (torn tail from a crash mid-write).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

use super::{WalEntry, HEADER_SIZE};

/// Reads records from the WAL file sequentially
pub struct WalReader {
    file: File,
    position: u64,
    file_size: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        Ok(Self {
            file,
            position: 0,
            file_size,
        })
    }

    /// Read the next record from the WAL.
    ///
    /// Returns:
    /// - `Ok(Some(entry))` - a complete, checksum-valid record
    /// - `Ok(None)` - EOF, or an incomplete/corrupt trailing frame
    /// - `Err(...)` - I/O error
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        // Step 1: a full header must be present
        if self.position + HEADER_SIZE as u64 > self.file_size {
            if self.position < self.file_size {
                tracing::warn!(
                    "discarding {} trailing WAL bytes (short header)",
                    self.file_size - self.position
                );
            }
            return Ok(None);
        }

        // Step 2: read and parse the header
        let mut header = [0u8; HEADER_SIZE];
        self.file.read_exact(&mut header)?;

        let lsn = u64::from_le_bytes(header[0..8].try_into().unwrap());
        let crc = u32::from_le_bytes(header[8..12].try_into().unwrap());
        let len = u32::from_le_bytes(header[12..16].try_into().unwrap()) as usize;

        // Step 3: the declared payload must be present in full
        if self.position + (HEADER_SIZE + len) as u64 > self.file_size {
            tracing::warn!(
                "discarding {} trailing WAL bytes (short payload, lsn {})",
                self.file_size - self.position,
                lsn
            );
            return Ok(None);
        }

        // Step 4: read the payload and verify the checksum
        let mut payload = vec![0u8; len];
        self.file.read_exact(&mut payload)?;

        if crc32fast::hash(&payload) != crc {
            tracing::warn!("discarding WAL tail from lsn {} (checksum mismatch)", lsn);
            return Ok(None);
        }

        // Step 5: decode; a malformed payload ends replay the same way
        let entry = match WalEntry::decode_payload(lsn, &payload) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("discarding WAL tail from lsn {}: {}", lsn, e);
                return Ok(None);
            }
        };

        self.position += (HEADER_SIZE + len) as u64;

        Ok(Some(entry))
    }

    /// Consume the reader and iterate over all complete records
    pub fn entries(self) -> WalIterator {
        WalIterator { reader: self }
    }
}

/// Iterator over complete WAL records
pub struct WalIterator {
    reader: WalReader,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
