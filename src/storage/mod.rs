//! Storage Module
//!
//! One append-only file per database, opened per operation through a
//! short-lived [`Handle`].
//!
//! ## Responsibilities
//! - Map database names to files and create them atomically
//! - Lock the file (shared for readers, exclusive for the single writer)
//! - Append one CRC-framed record per committed transaction
//! - Replay records on open, ignoring a torn final record
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Header (24 bytes)                       │
//! │ Magic "BKVD" (4) | Version (2) | Rsv (2)│
//! │ Start (8) | Limit (8)                   │
//! ├─────────────────────────────────────────┤
//! │ Commit Record 1  (at Start)             │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ Len (4) │ CRC (4) │ bincode payload │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Commit Record 2 ...                     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! `Start` and `Limit` bound the live records. They move only while a
//! writer compacts the file in place (see [`RecordWriter::move_to_front`]).

mod handle;
mod lock;
mod reader;
mod record;
mod recovery;
mod writer;

pub use handle::{validate_database_name, Handle};
pub use lock::{LockGuard, LockMode};
pub use reader::{Frame, RecordReader};
pub use record::{CommitRecord, Decoded, Op, MAX_RECORD_SIZE, RECORD_HEADER_SIZE};
pub use recovery::Replay;
pub use writer::RecordWriter;

use crate::error::{KvError, Result};

// =============================================================================
// File Header
// =============================================================================

/// Magic bytes identifying a BucketKV database file
pub const MAGIC: &[u8; 4] = b"BKVD";

/// Current file format version
pub const FORMAT_VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Reserved (2) + Start (8) + Limit (8)
pub const FILE_HEADER_SIZE: usize = 24;

/// Location of the live records inside a database file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Offset of the first live record
    pub start: u64,

    /// Offset just past the last live record; 0 = records run to end of file
    pub limit: u64,
}

impl FileHeader {
    /// Header of a file whose records follow it directly
    pub fn fresh() -> Self {
        Self {
            start: FILE_HEADER_SIZE as u64,
            limit: 0,
        }
    }

    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut header = [0u8; FILE_HEADER_SIZE];
        header[0..4].copy_from_slice(MAGIC);
        header[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        header[8..16].copy_from_slice(&self.start.to_le_bytes());
        header[16..24].copy_from_slice(&self.limit.to_le_bytes());
        header
    }

    /// Parse and validate the header at the start of a file image
    pub fn decode(image: &[u8]) -> Result<Self> {
        if image.len() < FILE_HEADER_SIZE {
            return Err(KvError::Corruption(format!(
                "file too short for header: {} bytes",
                image.len()
            )));
        }

        if &image[0..4] != MAGIC {
            return Err(KvError::Corruption(format!(
                "invalid magic: expected BKVD, got {:?}",
                &image[0..4]
            )));
        }

        let version = u16::from_le_bytes([image[4], image[5]]);
        if version != FORMAT_VERSION {
            return Err(KvError::Corruption(format!(
                "unsupported format version: {}",
                version
            )));
        }

        let mut word = [0u8; 8];
        word.copy_from_slice(&image[8..16]);
        let start = u64::from_le_bytes(word);
        word.copy_from_slice(&image[16..24]);
        let limit = u64::from_le_bytes(word);

        if start < FILE_HEADER_SIZE as u64 || (limit != 0 && limit < start) {
            return Err(KvError::Corruption(format!(
                "invalid record bounds: start={} limit={}",
                start, limit
            )));
        }

        Ok(Self { start, limit })
    }
}

/// Bytes of a fresh database file
pub fn encode_header() -> [u8; FILE_HEADER_SIZE] {
    FileHeader::fresh().encode()
}
