//! Storage Handle Manager
//!
//! Turns a database name into an open file. A [`Handle`] lives for one
//! operation; dropping it closes the file and releases any lock it held.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::{StoreConfig, SyncMode};
use crate::error::{KvError, Result};

use super::lock::{self, LockGuard, LockMode};
use super::recovery::Replay;
use super::{encode_header, FileHeader, FILE_HEADER_SIZE};

/// Distinguishes temp files created concurrently by one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Transient reference to an open database file
#[derive(Debug)]
pub struct Handle {
    /// Logical database name
    database: String,

    /// Backing file path
    path: PathBuf,

    /// Open file; `None` once closed
    file: Option<File>,

    sync_mode: SyncMode,

    lock_timeout: Option<Duration>,

    /// File size below which a commit never compacts
    compaction_min_bytes: u64,
}

impl Handle {
    /// Open (creating if absent) the file for `database`
    ///
    /// Any failure here is `StorageUnavailable`, except a bad name which is
    /// `InvalidInput` and never touches the filesystem.
    pub fn open(config: &StoreConfig, database: &str) -> Result<Self> {
        validate_database_name(database)?;

        let path = config
            .data_dir
            .join(format!("{}.{}", database, config.file_extension));

        if !path.exists() {
            create_fresh(config, &path).map_err(|e| KvError::unavailable(database, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| KvError::unavailable(database, e))?;

        let mut header = [0u8; FILE_HEADER_SIZE];
        file.read_exact(&mut header)
            .map_err(|_| KvError::unavailable(database, "not a BucketKV database file"))?;
        FileHeader::decode(&header).map_err(|e| KvError::unavailable(database, e))?;

        tracing::trace!("Opened database '{}' at {}", database, path.display());

        Ok(Self {
            database: database.to_string(),
            path,
            file: Some(file),
            sync_mode: config.sync_mode,
            lock_timeout: config.lock_timeout,
            compaction_min_bytes: config.compaction_min_bytes,
        })
    }

    /// Close the file. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            tracing::trace!("Closed database '{}'", self.database);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Logical database name
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    pub(crate) fn compaction_min_bytes(&self) -> u64 {
        self.compaction_min_bytes
    }

    pub(crate) fn file(&self) -> Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| KvError::unavailable(&self.database, "handle is closed"))
    }

    /// Lock the file in `mode`, honoring the configured wait bound
    pub(crate) fn lock(&self, mode: LockMode) -> Result<LockGuard<'_>> {
        lock::acquire(self.file()?, mode, &self.database, self.lock_timeout)
    }

    /// Read and replay the whole file. Caller must hold a lock.
    pub(crate) fn load(&self) -> Result<Replay> {
        let mut file = self.file()?;
        let mut image = Vec::new();
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_to_end(&mut image))
            .map_err(|e| KvError::unavailable(&self.database, e))?;

        let replay =
            Replay::from_image(&image).map_err(|e| KvError::unavailable(&self.database, e))?;

        if replay.torn_tail {
            tracing::warn!(
                "Database '{}': ignoring torn record at offset {} ({} trailing bytes)",
                self.database,
                replay.valid_len,
                replay.file_len - replay.valid_len
            );
        } else if replay.has_stale_tail() {
            tracing::trace!(
                "Database '{}': {} bytes past the live records",
                self.database,
                replay.file_len - replay.valid_len
            );
        }

        Ok(replay)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Database names map to file names
///
/// Non-empty, no path separators or NUL, no leading dot.
pub fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KvError::InvalidInput(
            "database name must not be empty".to_string(),
        ));
    }
    if name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(KvError::InvalidInput(format!(
            "invalid database name '{}'",
            name
        )));
    }
    Ok(())
}

/// Atomically create a database file holding only the header
///
/// The header goes to a private temp file which is then hard-linked into
/// place; the link fails if another creator got there first, in which case
/// their file is kept.
fn create_fresh(config: &StoreConfig, path: &Path) -> io::Result<()> {
    fs::create_dir_all(&config.data_dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = config.data_dir.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = write_header_file(config, &tmp).and_then(|_| match fs::hard_link(&tmp, path) {
        Ok(()) => sync_dir(&config.data_dir),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    });

    let _ = fs::remove_file(&tmp);

    if result.is_ok() {
        tracing::debug!("Created database file {}", path.display());
    }
    result
}

fn write_header_file(config: &StoreConfig, tmp: &Path) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(config.file_mode);
    }
    #[cfg(not(unix))]
    let _ = config;

    let mut file = options.open(tmp)?;
    file.write_all(&encode_header())?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
