//! Record Writer
//!
//! Appends commit records to a locked database file and makes them durable.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use crate::config::SyncMode;
use crate::error::{KvError, Result};

use super::record::CommitRecord;
use super::{FileHeader, FILE_HEADER_SIZE};

/// Appends records to a database file
///
/// The caller must hold the file's exclusive lock for the writer's lifetime.
pub struct RecordWriter<'a> {
    file: &'a File,
    sync_mode: SyncMode,

    /// Set when a failed commit could not be undone
    poisoned: bool,
}

impl<'a> RecordWriter<'a> {
    pub fn new(file: &'a File, sync_mode: SyncMode) -> Self {
        Self {
            file,
            sync_mode,
            poisoned: false,
        }
    }

    /// A commit failed and its bytes may still be on disk
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Drop everything past `len` (removes a torn tail) and sync
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.sync()
    }

    /// Rewrite the file header and sync
    pub fn write_header(&mut self, header: &FileHeader) -> Result<()> {
        self.write_at(0, &header.encode())
    }

    /// Append `record` at `offset`, sync, and return the new file length
    pub fn append(&mut self, offset: u64, record: &CommitRecord) -> Result<u64> {
        let frame = record.encode()?;
        self.write_at(offset, &frame)?;
        Ok(offset + frame.len() as u64)
    }

    /// Append `record` as a transaction's commit, undoing it on failure
    ///
    /// If the undo fails too the writer is poisoned: the record may or may
    /// not be visible to the next replay, and nothing more is written.
    pub fn commit(&mut self, offset: u64, record: &CommitRecord) -> Result<u64> {
        if self.poisoned {
            return Err(KvError::TransactionAborted(
                "writer unusable after a failed rollback".to_string(),
            ));
        }

        match self.append(offset, record) {
            Ok(len) => Ok(len),
            Err(e) => match self.truncate(offset) {
                Ok(()) => Err(KvError::TransactionAborted(format!("commit failed: {}", e))),
                Err(cut) => {
                    self.poisoned = true;
                    tracing::warn!(
                        "Commit seq={} failed ({}) and could not be rolled back: {}",
                        record.seq,
                        e,
                        cut
                    );
                    Err(KvError::TransactionAborted(format!(
                        "commit failed and rollback failed, outcome unknown: {}",
                        e
                    )))
                }
            },
        }
    }

    /// Move a full-state `snapshot`, already committed at `at`, to the front
    /// of the file and drop everything else. Returns the new file length.
    ///
    /// The header always points at a complete copy of the snapshot:
    /// 1. point at the copy at `at`
    /// 2. write the front copy (it must end before `at`)
    /// 3. point at the front copy, bounded so stale bytes behind it are ignored
    /// 4. cut the file, then drop the bound
    pub fn move_to_front(&mut self, at: u64, snapshot: &CommitRecord) -> Result<u64> {
        let frame = snapshot.encode()?;
        let base = FILE_HEADER_SIZE as u64;
        let end = base + frame.len() as u64;
        if end > at {
            return Err(KvError::TransactionAborted(format!(
                "snapshot of {} bytes does not fit before offset {}",
                frame.len(),
                at
            )));
        }

        self.write_header(&FileHeader {
            start: at,
            limit: 0,
        })?;
        self.write_at(base, &frame)?;
        self.write_header(&FileHeader {
            start: base,
            limit: end,
        })?;
        self.truncate(end)?;
        self.write_header(&FileHeader::fresh())?;

        Ok(end)
    }

    /// Force data to disk according to the sync mode
    pub fn sync(&mut self) -> Result<()> {
        match self.sync_mode {
            SyncMode::Full => self.file.sync_all()?,
            SyncMode::Data => self.file.sync_data()?,
        }
        Ok(())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut file = self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        file.flush()?;
        self.sync()
    }
}
