//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging: every write
//! is framed, appended, and fsynced before the engine acknowledges it.
//!
//! ## Responsibilities
//! - Append log records before any mutation is visible
//! - CRC32 checksums for torn-write detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Sequential replay for crash recovery
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Record 1                                     │
//! │ ┌─────────┬─────────┬─────────┬────────────┐ │
//! │ │ LSN (8) │ CRC (4) │ Len (4) │  Payload   │ │
//! │ └─────────┴─────────┴─────────┴────────────┘ │
//! ├──────────────────────────────────────────────┤
//! │ Record 2                                     │
//! │ ┌─────────┬─────────┬─────────┬────────────┐ │
//! │ │ LSN (8) │ CRC (4) │ Len (4) │  Payload   │ │
//! │ └─────────┴─────────┴─────────┴────────────┘ │
//! └──────────────────────────────────────────────┘
//!
//! Payload:
//!   PUT: [0x01][key_len: u32][key][val_len: u32][value]
//!   DEL: [0x02][key_len: u32][key]
//! ```
//!
//! An incomplete record at the end of the file (torn write from a crash) is
//! silently discarded on replay; everything before it is replayed in order.

mod entry;
mod reader;
mod writer;

pub use entry::{Operation, WalEntry, HEADER_SIZE};
pub use reader::{WalIterator, WalReader};
pub use writer::WalWriter;
