//! Command definitions
//!
//! Represents commands from clients.

use serde::{Deserialize, Serialize};

use crate::engine::Keystore;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Auth = 0x01,
    Write = 0x02,
    Read = 0x03,
    Delete = 0x04,
    Ping = 0x05,
}

impl CommandType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(CommandType::Auth),
            0x02 => Some(CommandType::Write),
            0x03 => Some(CommandType::Read),
            0x04 => Some(CommandType::Delete),
            0x05 => Some(CommandType::Ping),
            _ => None,
        }
    }
}

/// The three bulk verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Write,
    Read,
    Delete,
}

/// Target and payload of a bulk verb
///
/// For reads and deletes only the keys of `keystore` matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub db: String,
    pub bucket: String,
    pub keystore: Keystore,
}

impl Request {
    pub fn new(db: impl Into<String>, bucket: impl Into<String>, keystore: Keystore) -> Self {
        Self {
            db: db.into(),
            bucket: bucket.into(),
            keystore,
        }
    }

    /// Build a key-only request (values left empty)
    pub fn with_keys<I, K>(db: impl Into<String>, bucket: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keystore = keys.into_iter().map(|k| (k.into(), String::new())).collect();
        Self::new(db, bucket, keystore)
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Present credentials for this connection
    Auth { username: String, password: String },

    /// Upsert entries
    Write(Request),

    /// Fetch entries (all of them if the keystore is empty)
    Read(Request),

    /// Remove entries
    Delete(Request),

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Auth { .. } => CommandType::Auth,
            Command::Write(_) => CommandType::Write,
            Command::Read(_) => CommandType::Read,
            Command::Delete(_) => CommandType::Delete,
            Command::Ping => CommandType::Ping,
        }
    }

    /// The bulk verb and request carried by this command, if any
    pub fn as_bulk(&self) -> Option<(Verb, &Request)> {
        match self {
            Command::Write(req) => Some((Verb::Write, req)),
            Command::Read(req) => Some((Verb::Read, req)),
            Command::Delete(req) => Some((Verb::Delete, req)),
            Command::Auth { .. } | Command::Ping => None,
        }
    }
}
