//! Replay
//!
//! Rebuilds a database's bucket namespace from its file image.

use crate::bucket::BucketDirectory;
use crate::error::{KvError, Result};

use super::reader::{Frame, RecordReader};
use super::FileHeader;

/// State recovered from a database file
#[derive(Debug)]
pub struct Replay {
    /// Buckets as of the last committed transaction
    pub directory: BucketDirectory,

    /// Where the header says the live records are
    pub header: FileHeader,

    /// Number of committed records applied
    pub records: u64,

    /// Sequence number of the last committed record (0 if none)
    pub last_seq: u64,

    /// Offset just past the last valid record
    pub valid_len: u64,

    /// Length of the whole image
    pub file_len: u64,

    /// Whether the record section ends in a partially written record
    pub torn_tail: bool,
}

impl Replay {
    /// Replay every committed record in `image`
    ///
    /// Records are applied whole: a torn final record contributes nothing.
    pub fn from_image(image: &[u8]) -> Result<Self> {
        let header = FileHeader::decode(image)?;

        let end = match header.limit {
            0 => image.len() as u64,
            limit => limit,
        };
        if end > image.len() as u64 || header.start > end {
            return Err(KvError::Corruption(format!(
                "record bounds {}..{} outside file of {} bytes",
                header.start,
                end,
                image.len()
            )));
        }

        let mut directory = BucketDirectory::new();
        let mut reader = RecordReader::new(&image[..end as usize], header.start as usize);
        let mut records = 0u64;
        let mut last_seq = 0u64;
        let mut torn_tail = false;

        loop {
            match reader.next_frame()? {
                Frame::Record(record) => {
                    for op in &record.ops {
                        directory.apply(op)?;
                    }
                    last_seq = record.seq;
                    records += 1;
                }
                Frame::End => break,
                Frame::TornTail => {
                    torn_tail = true;
                    break;
                }
            }
        }

        Ok(Self {
            directory,
            header,
            records,
            last_seq,
            valid_len: reader.position() as u64,
            file_len: image.len() as u64,
            torn_tail,
        })
    }

    /// Whether bytes past the last valid record must be cut before appending
    pub fn has_stale_tail(&self) -> bool {
        self.valid_len < self.file_len
    }
}
