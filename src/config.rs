//! Configuration for BucketKV
//!
//! Two independent configurations with sensible defaults:
//! - [`StoreConfig`] drives the storage core (files, durability, locking)
//! - [`ServerConfig`] drives the TCP front end (address, credentials, pool)
//!
//! Both are built once at startup and never mutated afterwards.

use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Store Configuration
// =============================================================================

/// Configuration for the storage core
#[derive(Debug, Clone)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // File Layout
    // -------------------------------------------------------------------------
    /// Directory holding one file per database:
    ///   {data_dir}/
    ///     ├── shop.db
    ///     └── users.db
    pub data_dir: PathBuf,

    /// Extension appended to a database name to form its file name
    pub file_extension: String,

    /// Permission bits for newly created database files (unix only)
    pub file_mode: u32,

    // -------------------------------------------------------------------------
    // Durability / Locking
    // -------------------------------------------------------------------------
    /// How a commit is flushed to disk before it reports success
    pub sync_mode: SyncMode,

    /// Upper bound on waiting for a database lock; `None` waits forever
    pub lock_timeout: Option<Duration>,

    // -------------------------------------------------------------------------
    // Compaction
    // -------------------------------------------------------------------------
    /// A commit rewrites the file as one snapshot record once the file would
    /// reach this size and the snapshot is at most half of it
    pub compaction_min_bytes: u64,
}

/// Commit flush strategy
///
/// Both variants make a commit durable before it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` data and metadata
    Full,

    /// `fdatasync`: data plus the metadata needed to read it back
    Data,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./bucketkv_data"),
            file_extension: "db".to_string(),
            file_mode: 0o600,
            sync_mode: SyncMode::Full,
            lock_timeout: None,
            compaction_min_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the data directory (root for all database files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the database file extension (without the dot)
    pub fn file_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.file_extension = ext.into();
        self
    }

    /// Set the permission bits for new database files
    pub fn file_mode(mut self, mode: u32) -> Self {
        self.config.file_mode = mode;
        self
    }

    /// Set the commit sync mode
    pub fn sync_mode(mut self, mode: SyncMode) -> Self {
        self.config.sync_mode = mode;
        self
    }

    /// Bound the wait for a database lock
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.lock_timeout = Some(timeout);
        self
    }

    /// Set the file size at which commits start compacting
    pub fn compaction_min_bytes(mut self, bytes: u64) -> Self {
        self.config.compaction_min_bytes = bytes;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Username/password pair every client must present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check a presented pair against these credentials
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// Configuration for the TCP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP listen address
    pub listen_addr: String,

    /// Credentials clients must authenticate with
    pub credentials: Credentials,

    /// Number of connection worker threads
    pub worker_threads: usize,

    /// Accepted connections allowed to wait for a free worker
    pub max_pending_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            credentials: Credentials::new("admin", "admin"),
            worker_threads: 8,
            max_pending_connections: 1024,
            read_timeout_ms: 30_000,
            write_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the required client credentials
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Set the number of worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the pending connection queue size
    pub fn max_pending_connections(mut self, count: usize) -> Self {
        self.config.max_pending_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
