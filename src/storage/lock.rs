//! Advisory locks on database files.
//!
//! The database file is its own lock (fs2, flock-style):
//! - Shared: any number of read transactions.
//! - Exclusive: one write transaction, no readers.
//!
//! Each handle opens its own file description, so locks conflict between
//! threads of one process as well as between processes.
//! Lock is released on Drop.
//!
//! Calls go through `FileExt::` explicitly: newer std has inherent
//! `File` lock methods with the same names and different error types.

use std::fs::File;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{KvError, Result};

/// Poll interval while waiting on a contended lock with a deadline
const POLL_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Held lock on a database file
pub struct LockGuard<'a> {
    file: &'a File,
    mode: LockMode,
}

impl<'a> LockGuard<'a> {
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // Closing the file would release it anyway.
        let _ = FileExt::unlock(self.file);
    }
}

/// Acquire `mode` on `file`, waiting at most `timeout` if one is given
pub fn acquire<'a>(
    file: &'a File,
    mode: LockMode,
    database: &str,
    timeout: Option<Duration>,
) -> Result<LockGuard<'a>> {
    match timeout {
        None => {
            let res = match mode {
                LockMode::Shared => FileExt::lock_shared(file),
                LockMode::Exclusive => FileExt::lock_exclusive(file),
            };
            res.map_err(|e| KvError::unavailable(database, format!("lock failed: {}", e)))?;
        }
        Some(limit) => {
            let started = Instant::now();
            loop {
                let res = match mode {
                    LockMode::Shared => FileExt::try_lock_shared(file),
                    LockMode::Exclusive => FileExt::try_lock_exclusive(file),
                };
                match res {
                    Ok(()) => break,
                    Err(e) if is_contended(&e) => {
                        if started.elapsed() >= limit {
                            return Err(KvError::Timeout {
                                database: database.to_string(),
                                waited_ms: started.elapsed().as_millis() as u64,
                            });
                        }
                        thread::sleep(POLL_INTERVAL);
                    }
                    Err(e) => {
                        return Err(KvError::unavailable(database, format!("lock failed: {}", e)))
                    }
                }
            }
        }
    }

    Ok(LockGuard { file, mode })
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == fs2::lock_contended_error().kind()
}
