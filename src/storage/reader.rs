//! Record Reader
//!
//! Walks the commit records of a database file image held in memory.

use crate::error::{KvError, Result};

use super::record::{CommitRecord, Decoded};

/// What the reader found at its current position
#[derive(Debug)]
pub enum Frame {
    /// A valid record
    Record(CommitRecord),

    /// Clean end of file
    End,

    /// The final record was only partially written
    TornTail,
}

/// Sequential reader over the record section of a database file
pub struct RecordReader<'a> {
    /// Whole file image
    buf: &'a [u8],

    /// Offset of the next unread frame
    position: usize,
}

impl<'a> RecordReader<'a> {
    /// Start reading `buf` at `offset` (the end of the file header)
    pub fn new(buf: &'a [u8], offset: usize) -> Self {
        Self {
            buf,
            position: offset,
        }
    }

    /// Offset just past the last valid record read so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Read the next frame
    ///
    /// A bad frame with nothing but zeros (or nothing at all) behind it is a
    /// torn tail: the last commit never completed. A bad frame with data
    /// behind it is corruption.
    pub fn next_frame(&mut self) -> Result<Frame> {
        let rest = &self.buf[self.position..];
        if rest.is_empty() {
            return Ok(Frame::End);
        }

        let (reason, frame_len) = match CommitRecord::decode(rest) {
            Decoded::Record(record, frame_len) => {
                self.position += frame_len;
                return Ok(Frame::Record(record));
            }
            Decoded::Incomplete => return Ok(Frame::TornTail),
            Decoded::ChecksumMismatch {
                expected,
                actual,
                frame_len,
            } => (
                format!("CRC mismatch: expected {:08x}, got {:08x}", expected, actual),
                frame_len,
            ),
            Decoded::Malformed { reason, frame_len } => (reason, frame_len),
        };

        if nothing_follows(rest, frame_len) {
            Ok(Frame::TornTail)
        } else {
            Err(KvError::Corruption(format!(
                "{} at offset {}",
                reason, self.position
            )))
        }
    }
}

/// Whether the bytes past a frame of `frame_len` are absent or all zero
fn nothing_follows(rest: &[u8], frame_len: usize) -> bool {
    rest.get(frame_len..)
        .map_or(true, |tail| tail.iter().all(|&b| b == 0))
}
