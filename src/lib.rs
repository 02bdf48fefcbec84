//! # BucketKV
//!
//! A single-node, file-backed key-value store with:
//! - One file per database, holding named buckets of ordered entries
//! - Atomic read-write transactions committed as one synced record
//! - Single-writer/multi-reader locking on the database file
//! - TCP-based client protocol with credential check
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (Credentials, Worker Pool)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Bulk Operation Engine                        │
//! │           (write_many / read_many / delete_many)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                Transactional Executor                        │
//! │        (run_write: exclusive / run_read: shared)             │
//! └──────────┬─────────────────────────────────┬────────────────┘
//!            │                                 │
//!            ▼                                 ▼
//!   ┌─────────────────┐               ┌─────────────────┐
//!   │ Storage Handle  │               │ Bucket Directory│
//!   │ (file + lock)   │               │ (ensure/lookup) │
//!   └─────────────────┘               └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod bucket;
pub mod engine;
pub mod network;
pub mod protocol;
pub mod storage;
pub mod txn;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Credentials, ServerConfig, StoreConfig, SyncMode};
pub use engine::{Engine, Keystore};
pub use error::{ErrorKind, KvError, Result};
pub use storage::Handle;
pub use txn::{BucketMut, ReadTxn, WriteTxn};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of BucketKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
