//! Engine Module
//!
//! Bulk key/value operations on top of the transaction executor.
//!
//! ## Responsibilities
//! - Validate names before any storage access
//! - Run each bulk verb inside exactly one transaction
//! - Open a handle per operation and always close it
//! - Turn every failure into a structured reply at the operation boundary

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bucket::validate_bucket_name;
use crate::config::StoreConfig;
use crate::error::{KvError, Result};
use crate::protocol::{Reply, Request, Response, Verb};
use crate::storage::{validate_database_name, Handle};

/// Key/value mapping exchanged with callers
pub type Keystore = BTreeMap<String, String>;

/// The bulk operation engine
///
/// Holds no open files: every operation opens its database, runs one
/// transaction and closes it again. Operations on different databases never
/// contend; operations on the same database are serialized by its file lock.
pub struct Engine {
    /// Storage configuration
    config: StoreConfig,
}

impl Engine {
    /// Create an engine over `config.data_dir`, creating the directory
    pub fn open(config: StoreConfig) -> Result<Self> {
        if config.file_extension.is_empty() {
            return Err(KvError::Config("file extension must not be empty".to_string()));
        }

        fs::create_dir_all(&config.data_dir).map_err(|e| {
            KvError::Config(format!(
                "cannot create data directory {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;

        Ok(Self { config })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(StoreConfig::builder().data_dir(path).build())
    }

    /// Acquire a handle on `database`
    pub fn open_handle(&self, database: &str) -> Result<Handle> {
        Handle::open(&self.config, database)
    }

    // =========================================================================
    // Bulk Operations
    // =========================================================================

    /// Upsert every entry into `bucket`, creating the bucket if needed
    ///
    /// All entries commit together or not at all. Returns the entry count.
    pub fn write_many(&self, database: &str, bucket: &str, entries: &Keystore) -> Result<usize> {
        validate_names(database, bucket)?;

        let mut handle = self.open_handle(database)?;
        handle.run_write(|txn| {
            let mut b = txn.ensure_bucket(bucket)?;
            for (key, value) in entries {
                b.put(key.as_bytes(), value.as_bytes())?;
            }
            Ok(())
        })?;

        tracing::debug!(
            database,
            bucket,
            count = entries.len(),
            "write_many committed"
        );
        Ok(entries.len())
    }

    /// Fetch entries from an existing bucket
    ///
    /// An empty `keys` returns the whole bucket in key order; otherwise only
    /// the requested keys that exist are returned.
    pub fn read_many<S: AsRef<str>>(
        &self,
        database: &str,
        bucket: &str,
        keys: &[S],
    ) -> Result<Keystore> {
        validate_names(database, bucket)?;

        let handle = self.open_handle(database)?;
        let found = handle.run_read(|txn| {
            let b = txn.lookup_bucket(bucket)?;
            let mut found = Keystore::new();

            if keys.is_empty() {
                for (key, value) in b.iter() {
                    found.insert(lossy(key), lossy(value));
                }
            } else {
                for key in keys {
                    let key = key.as_ref();
                    if let Some(value) = b.get(key.as_bytes()) {
                        found.insert(key.to_string(), lossy(value));
                    }
                }
            }
            Ok(found)
        })?;

        tracing::debug!(database, bucket, count = found.len(), "read_many");
        Ok(found)
    }

    /// Remove keys from an existing bucket
    ///
    /// Absent keys are ignored. The returned count is the number of keys
    /// requested, not the number that were present.
    pub fn delete_many<S: AsRef<str>>(
        &self,
        database: &str,
        bucket: &str,
        keys: &[S],
    ) -> Result<usize> {
        validate_names(database, bucket)?;

        let mut handle = self.open_handle(database)?;
        let removed = handle.run_write(|txn| {
            let mut b = txn.lookup_bucket(bucket)?;
            let mut removed = 0usize;
            for key in keys {
                if b.delete(key.as_ref().as_bytes()) {
                    removed += 1;
                }
            }
            Ok(removed)
        })?;

        tracing::debug!(
            database,
            bucket,
            requested = keys.len(),
            removed,
            "delete_many committed"
        );
        Ok(keys.len())
    }

    // =========================================================================
    // Operation Boundary
    // =========================================================================

    /// Execute a request
    ///
    /// Never fails: errors become `success = false` replies.
    pub fn execute(&self, verb: Verb, request: &Request) -> Response {
        let Request {
            db,
            bucket,
            keystore,
        } = request;

        let result = match verb {
            Verb::Write => self.write_many(db, bucket, keystore).map(|count| {
                Reply::success(
                    format!("Updated {} keys in {}", count, bucket),
                    count,
                    Keystore::new(),
                )
            }),
            Verb::Read => {
                let keys: Vec<&str> = keystore.keys().map(String::as_str).collect();
                self.read_many(db, bucket, &keys).map(|found| {
                    Reply::success(
                        format!("Got {} keys in {}", found.len(), bucket),
                        found.len(),
                        found,
                    )
                })
            }
            Verb::Delete => {
                let keys: Vec<&str> = keystore.keys().map(String::as_str).collect();
                self.delete_many(db, bucket, &keys).map(|count| {
                    Reply::success(
                        format!("Deleted {} keys in {}", count, bucket),
                        count,
                        Keystore::new(),
                    )
                })
            }
        };

        match result {
            Ok(reply) => Response::ok(reply),
            Err(e) => {
                tracing::debug!(database = %db, bucket = %bucket, ?verb, "operation failed: {}", e);
                Response::from_error(&e)
            }
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Path of the file backing `database`
    pub fn database_path(&self, database: &str) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.{}", database, self.config.file_extension))
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

fn validate_names(database: &str, bucket: &str) -> Result<()> {
    validate_database_name(database)?;
    validate_bucket_name(bucket)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
