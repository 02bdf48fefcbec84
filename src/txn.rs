//! Transaction Module
//!
//! Runs closures against one database as atomic, isolated units.
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
//!
//! - **run_write**: exclusive file lock for the whole closure
//!   - At most ONE write transaction per database file at a time
//!   - Sees the latest committed state plus its own writes
//!   - Commits as one appended record, synced before returning
//!
//! - **run_read**: shared file lock
//!   - Any number of readers at once, no writer while they run
//!   - Sees every transaction committed before it started
//!
//! An `Err` from the closure aborts: nothing is written and the error is
//! returned unchanged.

use crate::bucket::{Bucket, BucketDirectory};
use crate::error::{KvError, Result};
use crate::storage::{
    CommitRecord, FileHeader, Handle, LockMode, Op, RecordWriter, FILE_HEADER_SIZE,
    MAX_RECORD_SIZE, RECORD_HEADER_SIZE,
};

// =============================================================================
// Read Transactions
// =============================================================================

/// Consistent view of a database for the duration of `run_read`
#[derive(Debug)]
pub struct ReadTxn {
    directory: BucketDirectory,
    seq: u64,
}

impl ReadTxn {
    /// Resolve an existing bucket; never creates one
    pub fn lookup_bucket(&self, name: &str) -> Result<&Bucket> {
        self.directory.lookup_bucket(name)
    }

    /// Names of all buckets in this database
    pub fn bucket_names(&self) -> Vec<String> {
        self.directory.bucket_names().map(str::to_string).collect()
    }

    /// Sequence number of the last transaction visible to this view
    pub fn sequence(&self) -> u64 {
        self.seq
    }
}

// =============================================================================
// Write Transactions
// =============================================================================

/// Exclusive, mutable view of a database for the duration of `run_write`
#[derive(Debug)]
pub struct WriteTxn {
    directory: BucketDirectory,

    /// Mutations to commit, in order
    ops: Vec<Op>,

    /// Sequence number of the state this transaction started from
    base_seq: u64,
}

impl WriteTxn {
    /// Resolve a bucket, creating it if absent
    pub fn ensure_bucket(&mut self, name: &str) -> Result<BucketMut<'_>> {
        let (bucket, created) = self.directory.ensure_bucket(name)?;
        if created {
            self.ops.push(Op::CreateBucket {
                bucket: name.to_string(),
            });
        }

        Ok(BucketMut {
            name: name.to_string(),
            bucket,
            ops: &mut self.ops,
        })
    }

    /// Resolve an existing bucket; never creates one
    pub fn lookup_bucket(&mut self, name: &str) -> Result<BucketMut<'_>> {
        let bucket = self.directory.lookup_bucket_mut(name)?;

        Ok(BucketMut {
            name: name.to_string(),
            bucket,
            ops: &mut self.ops,
        })
    }

    /// Read-only access to a bucket, including this transaction's writes
    pub fn bucket(&self, name: &str) -> Result<&Bucket> {
        self.directory.lookup_bucket(name)
    }

    /// Number of mutations recorded so far
    pub fn pending_ops(&self) -> usize {
        self.ops.len()
    }

    /// Sequence number this transaction will commit as
    pub fn sequence(&self) -> u64 {
        self.base_seq + 1
    }
}

/// Mutable reference to one bucket inside a [`WriteTxn`]
pub struct BucketMut<'t> {
    name: String,
    bucket: &'t mut Bucket,
    ops: &'t mut Vec<Op>,
}

impl BucketMut<'_> {
    /// Insert or replace a value
    ///
    /// Keys must be non-empty.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(KvError::InvalidInput(format!(
                "empty key in bucket '{}'",
                self.name
            )));
        }
        let value = value.into();

        self.ops.push(Op::Put {
            bucket: self.name.clone(),
            key: key.clone(),
            value: value.clone(),
        });
        self.bucket.put(key, value);
        Ok(())
    }

    /// Remove a key; returns whether it was present
    ///
    /// Removing an absent key records nothing.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        if self.bucket.delete(key).is_none() {
            return false;
        }

        self.ops.push(Op::Delete {
            bucket: self.name.clone(),
            key: key.to_vec(),
        });
        true
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.bucket.get(key)
    }

    pub fn len(&self) -> usize {
        self.bucket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bucket.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Executor
// =============================================================================

impl Handle {
    /// Run `f` against a consistent snapshot of the database
    pub fn run_read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTxn) -> Result<T>,
    {
        let _guard = self.lock(LockMode::Shared)?;
        let replay = self.load()?;

        let txn = ReadTxn {
            directory: replay.directory,
            seq: replay.last_seq,
        };
        f(&txn)
    }

    /// Run `f` with exclusive access and commit its writes atomically
    ///
    /// Steps:
    /// 1. Acquire the exclusive lock (blocks behind any other writer)
    /// 2. Replay the committed state
    /// 3. Run `f`; on `Err` drop everything and return the error
    /// 4. Cut off a torn tail or leftovers of an interrupted compaction
    /// 5. Append one commit record and sync it
    /// 6. If the file has grown mostly dead, the record appended in 5 is a
    ///    snapshot of the whole database, which is then moved to the front
    pub fn run_write<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTxn) -> Result<T>,
    {
        let guard = self.lock(LockMode::Exclusive)?;
        let replay = self.load()?;
        let stale_tail = replay.has_stale_tail();

        let mut txn = WriteTxn {
            directory: replay.directory,
            ops: Vec::new(),
            base_seq: replay.last_seq,
        };

        let value = match f(&mut txn) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    "Database '{}': transaction rolled back: {}",
                    self.database(),
                    e
                );
                return Err(e);
            }
        };

        if txn.ops.is_empty() {
            return Ok(value);
        }

        let seq = txn.sequence();
        let WriteTxn { directory, ops, .. } = txn;
        let op_count = ops.len();
        let record = CommitRecord::new(seq, ops);

        let snapshot = compaction_snapshot(
            replay.valid_len,
            record.frame_len()?,
            self.compaction_min_bytes(),
            seq,
            &directory,
        )?;

        let (outcome, poisoned) = {
            let mut writer = RecordWriter::new(self.file()?, self.sync_mode());
            let outcome = self.commit_record(
                &mut writer,
                &replay.header,
                replay.valid_len,
                stale_tail,
                snapshot.as_ref().unwrap_or(&record),
            );
            if let (Ok(()), Some(snapshot)) = (&outcome, &snapshot) {
                match writer.move_to_front(replay.valid_len, snapshot) {
                    Ok(len) => tracing::debug!(
                        "Database '{}': compacted to {} bytes at seq={}",
                        self.database(),
                        len,
                        seq
                    ),
                    // Committed either way; the next writer finishes the cleanup
                    Err(e) => tracing::warn!(
                        "Database '{}': compaction after seq={} failed: {}",
                        self.database(),
                        seq,
                        e
                    ),
                }
            }
            (outcome, writer.is_poisoned())
        };

        drop(guard);
        if poisoned {
            self.close();
        }
        outcome?;

        tracing::trace!(
            "Database '{}': committed seq={} ({} ops)",
            self.database(),
            seq,
            op_count
        );

        Ok(value)
    }

    /// Prepare the file for an append at `valid_len`, then append `record`
    fn commit_record(
        &self,
        writer: &mut RecordWriter<'_>,
        header: &FileHeader,
        valid_len: u64,
        stale_tail: bool,
        record: &CommitRecord,
    ) -> Result<()> {
        // Cut before unbounding the header, or the stale bytes would replay
        if stale_tail {
            writer.truncate(valid_len).map_err(|e| {
                KvError::TransactionAborted(format!("failed to discard torn record: {}", e))
            })?;
        }
        if header.limit != 0 {
            writer
                .write_header(&FileHeader {
                    start: header.start,
                    limit: 0,
                })
                .map_err(|e| {
                    KvError::TransactionAborted(format!("failed to reset file header: {}", e))
                })?;
        }

        writer.commit(valid_len, record)?;
        Ok(())
    }
}

/// Snapshot to commit instead of the plain record, if the file is due for
/// compaction
///
/// Due means: the file would reach `min_bytes`, the snapshot is at most half
/// of it, and the live records already span at least one snapshot so the
/// front copy cannot overlap the appended one.
fn compaction_snapshot(
    valid_len: u64,
    record_len: u64,
    min_bytes: u64,
    seq: u64,
    directory: &BucketDirectory,
) -> Result<Option<CommitRecord>> {
    let projected = valid_len + record_len;
    if projected < min_bytes {
        return Ok(None);
    }

    let snapshot = CommitRecord::snapshot(seq, directory);
    let snapshot_len = snapshot.frame_len()?;
    let base = FILE_HEADER_SIZE as u64;

    let due = projected >= base + 2 * snapshot_len
        && valid_len >= base + snapshot_len
        && snapshot_len <= (RECORD_HEADER_SIZE as u64 + MAX_RECORD_SIZE as u64);
    Ok(due.then_some(snapshot))
}
