//! SSTable Reader
//!
//! Opens SSTable files and serves point lookups and bounded range scans via
//! an in-memory index.
//!
//! Structural validation happens entirely at open time: a table whose footer,
//! magic, or index does not hold up is reported as corrupt and never
//! installed.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::path::Path;

use crate::error::{Result, SableError};
use crate::memtable::Payload;

use super::iterator::SSTableIterator;
use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Reader for SSTable files with an in-memory dense index
pub struct SSTableReader {
    /// File handle for reading entries
    pub(super) file: BufReader<File>,
    /// In-memory index: key -> file offset
    index: BTreeMap<Vec<u8>, u64>,
    /// Entry count from the footer
    entry_count: u64,
    /// Index block starting offset (data block ends here)
    pub(super) index_offset: u64,
}

impl SSTableReader {
    /// Open an SSTable for reading.
    ///
    /// Reads the footer, validates the file structure, and loads the entire
    /// index into memory. Any structural violation is a corruption error and
    /// the table must not be installed.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(SableError::Corruption(format!(
                "{}: file too small for header and footer ({} bytes)",
                path.display(),
                file_size
            )));
        }

        // Header: magic + version
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(SableError::Corruption(format!(
                "{}: invalid magic {:?}",
                path.display(),
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes(header[4..6].try_into().unwrap());
        if version != VERSION {
            return Err(SableError::Corruption(format!(
                "{}: unsupported version {}",
                path.display(),
                version
            )));
        }

        // Footer: index offset + entry count + data CRC
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = u64::from_le_bytes(footer[0..8].try_into().unwrap());
        let entry_count = u64::from_le_bytes(footer[8..16].try_into().unwrap());
        let _data_crc = u32::from_le_bytes(footer[16..20].try_into().unwrap());

        let index_end = file_size - FOOTER_SIZE;
        if index_offset < HEADER_SIZE || index_offset > index_end {
            return Err(SableError::Corruption(format!(
                "{}: index offset {} outside data region",
                path.display(),
                index_offset
            )));
        }

        // Load and parse the index block; it must contain exactly
        // `entry_count` entries with offsets inside the data block.
        file.seek(SeekFrom::Start(index_offset))?;
        let mut index_data = vec![0u8; (index_end - index_offset) as usize];
        file.read_exact(&mut index_data)?;

        let index = Self::parse_index(path, &index_data, entry_count, index_offset)?;

        Ok(Self {
            file: BufReader::new(file),
            index,
            entry_count,
            index_offset,
        })
    }

    fn parse_index(
        path: &Path,
        index_data: &[u8],
        entry_count: u64,
        index_offset: u64,
    ) -> Result<BTreeMap<Vec<u8>, u64>> {
        let corrupt =
            |detail: &str| SableError::Corruption(format!("{}: {}", path.display(), detail));

        let mut index = BTreeMap::new();
        let mut pos = 0usize;

        while pos < index_data.len() {
            let key_len_bytes = index_data
                .get(pos..pos + 4)
                .ok_or_else(|| corrupt("truncated index entry"))?;
            let key_len = u32::from_le_bytes(key_len_bytes.try_into().unwrap()) as usize;
            pos += 4;

            let offset_bytes = index_data
                .get(pos..pos + 8)
                .ok_or_else(|| corrupt("truncated index entry"))?;
            let offset = u64::from_le_bytes(offset_bytes.try_into().unwrap());
            pos += 8;

            let key = index_data
                .get(pos..pos + key_len)
                .ok_or_else(|| corrupt("truncated index key"))?;
            pos += key_len;

            if offset < HEADER_SIZE || offset >= index_offset {
                return Err(corrupt("index entry points outside data block"));
            }

            index.insert(key.to_vec(), offset);
        }

        if index.len() as u64 != entry_count {
            return Err(corrupt("index entry count disagrees with footer"));
        }

        Ok(index)
    }

    /// Look up a key.
    ///
    /// Returns:
    /// - `Ok(Some(Payload::Value(_)))` - key present with a value
    /// - `Ok(Some(Payload::Tombstone))` - key present as a deletion
    /// - `Ok(None)` - key not in this table
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Payload>> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Ok(None),
        };

        let (_, payload) = self.read_record_at(offset, true)?;
        Ok(Some(payload))
    }

    /// Collect all entries with `start <= key <= end`, ascending by key.
    ///
    /// Tombstones are included; the engine decides what they shadow.
    pub fn range(&mut self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Payload)>> {
        if start > end {
            return Ok(Vec::new());
        }

        let hits: Vec<(Vec<u8>, u64)> = self
            .index
            .range::<[u8], _>((Bound::Included(start), Bound::Included(end)))
            .map(|(k, &off)| (k.clone(), off))
            .collect();

        let mut entries = Vec::with_capacity(hits.len());
        for (key, offset) in hits {
            let (_, payload) = self.read_record_at(offset, true)?;
            entries.push((key, payload));
        }

        Ok(entries)
    }

    /// Read one record at `offset`; skips key bytes when `skip_key` is set
    /// because the index already told us the key.
    fn read_record_at(&mut self, offset: u64, skip_key: bool) -> Result<(Vec<u8>, Payload)> {
        self.file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;

        let key_len = u32::from_le_bytes(header[0..4].try_into().unwrap()) as usize;
        let val_len = u32::from_le_bytes(header[4..8].try_into().unwrap());

        let key = if skip_key {
            self.file.seek(SeekFrom::Current(key_len as i64))?;
            Vec::new()
        } else {
            let mut key = vec![0u8; key_len];
            self.file.read_exact(&mut key)?;
            key
        };

        if val_len == TOMBSTONE_MARKER {
            return Ok((key, Payload::Tombstone));
        }

        let mut value = vec![0u8; val_len as usize];
        self.file.read_exact(&mut value)?;

        Ok((key, Payload::Value(value)))
    }

    /// Entry count from the footer
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Smallest key in this table (None if empty)
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    /// Largest key in this table (None if empty)
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Quick check whether a key could be in this table.
    /// False only if the key falls outside [min_key, max_key].
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false, // empty table
        }
    }

    /// Iterate all entries in key order (for compaction)
    pub fn iter(&mut self) -> Result<SSTableIterator<'_>> {
        SSTableIterator::new(&mut self.file, self.index_offset)
    }
}
