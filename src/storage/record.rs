//! Commit records
//!
//! One record is appended per committed read-write transaction. The record
//! carries every mutation of that transaction so replay applies it as a unit.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::bucket::BucketDirectory;
use crate::error::{KvError, Result};

/// Frame header: payload length (4) + CRC32 of payload (4)
pub const RECORD_HEADER_SIZE: usize = 8;

/// Largest payload a single record may carry (256 MB)
pub const MAX_RECORD_SIZE: u32 = 256 * 1024 * 1024;

/// A single committed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Commit sequence number - monotonically increasing per database
    pub seq: u64,

    /// Timestamp (unix millis) when the transaction committed
    pub timestamp: u64,

    /// Mutations in the order the transaction performed them
    pub ops: Vec<Op>,
}

/// Mutations that can be recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Every bucket is dropped; opens a full-state snapshot
    Reset,

    /// A bucket came into existence
    CreateBucket { bucket: String },

    /// Upsert a key in a bucket
    Put {
        bucket: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Remove a key from a bucket
    Delete { bucket: String, key: Vec<u8> },
}

/// Outcome of decoding one frame from a byte buffer
#[derive(Debug)]
pub enum Decoded {
    /// A valid record and the number of bytes it occupied
    Record(CommitRecord, usize),

    /// The buffer ends before the frame does
    Incomplete,

    /// The frame is complete but its checksum does not match
    ChecksumMismatch { expected: u32, actual: u32, frame_len: usize },

    /// The frame cannot hold a commit record (zero or oversized length,
    /// or a payload that does not deserialize)
    Malformed { reason: String, frame_len: usize },
}

impl CommitRecord {
    /// Create a record stamped with the current time
    pub fn new(seq: u64, ops: Vec<Op>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self { seq, timestamp, ops }
    }

    /// Record that rebuilds all of `directory` from nothing
    pub fn snapshot(seq: u64, directory: &BucketDirectory) -> Self {
        let mut ops = vec![Op::Reset];
        for (name, bucket) in directory.iter() {
            ops.push(Op::CreateBucket {
                bucket: name.to_string(),
            });
            ops.extend(bucket.iter().map(|(key, value)| Op::Put {
                bucket: name.to_string(),
                key: key.to_vec(),
                value: value.to_vec(),
            }));
        }
        Self::new(seq, ops)
    }

    /// Size of this record once framed
    pub fn frame_len(&self) -> Result<u64> {
        Ok(RECORD_HEADER_SIZE as u64 + bincode::serialized_size(self)?)
    }

    /// Encode into a frame: `[len u32 LE][crc u32 LE][bincode payload]`
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        if payload.len() > MAX_RECORD_SIZE as usize {
            return Err(KvError::TransactionAborted(format!(
                "commit record too large: {} bytes (max {})",
                payload.len(),
                MAX_RECORD_SIZE
            )));
        }

        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Decode the frame at the start of `bytes`
    ///
    /// Never fails outright: whether a bad frame is a torn write or
    /// corruption depends on what follows it, which only the reader knows.
    pub fn decode(bytes: &[u8]) -> Decoded {
        if bytes.len() < RECORD_HEADER_SIZE {
            return Decoded::Incomplete;
        }

        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let expected = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let frame_len = RECORD_HEADER_SIZE.saturating_add(len as usize);

        // A zeroed header passes its checksum (crc32 of nothing is 0)
        if len == 0 {
            return Decoded::Malformed {
                reason: "zero-length record".to_string(),
                frame_len,
            };
        }
        // The length is garbage, so only the header belongs to this frame
        if len > MAX_RECORD_SIZE {
            return Decoded::Malformed {
                reason: format!("record length {} exceeds maximum {}", len, MAX_RECORD_SIZE),
                frame_len: RECORD_HEADER_SIZE,
            };
        }

        if bytes.len() < frame_len {
            return Decoded::Incomplete;
        }

        let payload = &bytes[RECORD_HEADER_SIZE..frame_len];
        let actual = crc32fast::hash(payload);
        if actual != expected {
            return Decoded::ChecksumMismatch {
                expected,
                actual,
                frame_len,
            };
        }

        match bincode::deserialize(payload) {
            Ok(record) => Decoded::Record(record, frame_len),
            Err(e) => Decoded::Malformed {
                reason: format!("undecodable record: {}", e),
                frame_len,
            },
        }
    }
}
