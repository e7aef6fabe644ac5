//! SSTable Iterator
//!
//! Sequential iteration over all entries in an SSTable's data block.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::{Result, SableError};
use crate::memtable::Payload;

use super::{HEADER_SIZE, TOMBSTONE_MARKER};

/// Iterator over SSTable entries in sorted key order
pub struct SSTableIterator<'a> {
    file: &'a mut BufReader<File>,
    /// Stop reading at this offset (start of the index block)
    end_offset: u64,
    /// Current position in the file
    current_offset: u64,
}

impl<'a> SSTableIterator<'a> {
    /// Create a new iterator positioned at the start of the data block
    pub(super) fn new(file: &'a mut BufReader<File>, end_offset: u64) -> Result<Self> {
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(Self {
            file,
            end_offset,
            current_offset: HEADER_SIZE,
        })
    }
}

impl<'a> Iterator for SSTableIterator<'a> {
    type Item = Result<(Vec<u8>, Payload)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_offset >= self.end_offset {
            return None;
        }

        let mut header = [0u8; 8];
        if let Err(e) = self.file.read_exact(&mut header) {
            return Some(Err(SableError::Io(e)));
        }

        let key_len = u32::from_le_bytes(header[0..4].try_into().unwrap()) as usize;
        let val_len = u32::from_le_bytes(header[4..8].try_into().unwrap());

        let mut key = vec![0u8; key_len];
        if let Err(e) = self.file.read_exact(&mut key) {
            return Some(Err(SableError::Io(e)));
        }

        let mut entry_size = 8 + key_len as u64;

        let payload = if val_len == TOMBSTONE_MARKER {
            Payload::Tombstone
        } else {
            let mut value = vec![0u8; val_len as usize];
            if let Err(e) = self.file.read_exact(&mut value) {
                return Some(Err(SableError::Io(e)));
            }
            entry_size += val_len as u64;
            Payload::Value(value)
        };

        self.current_offset += entry_size;

        Some(Ok((key, payload)))
    }
}
