//! WAL record definitions and framing.

use crate::error::{Result, SableError};

/// Record header size: LSN (8) + CRC (4) + payload length (4)
pub const HEADER_SIZE: usize = 16;

/// Payload operation tags
const OP_PUT: u8 = 0x01;
const OP_DELETE: u8 = 0x02;

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

/// A single record in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Log Sequence Number - strictly increasing per engine instance
    pub lsn: u64,

    /// The operation to replay
    pub operation: Operation,
}

impl WalEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        Self { lsn, operation }
    }

    /// Encode the full record frame: header followed by payload.
    ///
    /// The CRC covers the payload only; the header fields are validated
    /// structurally on replay (a short header means a torn tail).
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.encode_payload();
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&self.lsn.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame
    }

    /// Encode the payload: op tag plus length-prefixed strings.
    fn encode_payload(&self) -> Vec<u8> {
        match &self.operation {
            Operation::Put { key, value } => {
                let mut buf = Vec::with_capacity(1 + 8 + key.len() + value.len());
                buf.push(OP_PUT);
                buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
                buf.extend_from_slice(key);
                buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
                buf.extend_from_slice(value);
                buf
            }
            Operation::Delete { key } => {
                let mut buf = Vec::with_capacity(1 + 4 + key.len());
                buf.push(OP_DELETE);
                buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
                buf.extend_from_slice(key);
                buf
            }
        }
    }

    /// Decode a payload whose CRC has already been verified.
    pub fn decode_payload(lsn: u64, payload: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(payload);

        let op = cursor.read_u8()?;
        let key = cursor.read_prefixed()?;

        let operation = match op {
            OP_PUT => {
                let value = cursor.read_prefixed()?;
                Operation::Put { key, value }
            }
            OP_DELETE => Operation::Delete { key },
            other => {
                return Err(SableError::Corruption(format!(
                    "unknown WAL operation tag: {:#04x}",
                    other
                )))
            }
        };

        if !cursor.is_exhausted() {
            return Err(SableError::Corruption(
                "trailing bytes after WAL record payload".to_string(),
            ));
        }

        Ok(Self { lsn, operation })
    }
}

/// Minimal bounds-checked cursor over a payload slice.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| SableError::Corruption("truncated WAL record payload".to_string()))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let end = self.pos + 4;
        let bytes = self
            .buf
            .get(self.pos..end)
            .ok_or_else(|| SableError::Corruption("truncated WAL record payload".to_string()))?;
        self.pos = end;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_prefixed(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        let end = self.pos + len;
        let bytes = self
            .buf
            .get(self.pos..end)
            .ok_or_else(|| SableError::Corruption("truncated WAL record payload".to_string()))?;
        self.pos = end;
        Ok(bytes.to_vec())
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }
}
