//! Response definitions
//!
//! Represents responses to clients.

use serde::{Deserialize, Serialize};

use crate::engine::Keystore;
use crate::error::{ErrorKind, KvError};

/// Response status codes
///
/// A hint only; `Reply::success` is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    Forbidden = 0x03,
    BadRequest = 0x04,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Error),
            0x03 => Some(Status::Forbidden),
            0x04 => Some(Status::BadRequest),
            _ => None,
        }
    }
}

/// Structured result of an operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub success: bool,
    pub message: String,

    /// Entries written, read, or requested for deletion
    pub count: u64,

    /// Entries returned by a read; empty otherwise
    pub keystore: Keystore,
}

impl Reply {
    pub fn success(message: impl Into<String>, count: usize, keystore: Keystore) -> Self {
        Self {
            success: true,
            message: message.into(),
            count: count as u64,
            keystore,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            count: 0,
            keystore: Keystore::new(),
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    pub reply: Reply,
}

impl Response {
    /// Create an OK response
    pub fn ok(reply: Reply) -> Self {
        Self {
            status: Status::Ok,
            reply,
        }
    }

    /// Create a failure response for an operation error
    pub fn from_error(error: &KvError) -> Self {
        let status = match error.kind() {
            ErrorKind::BucketNotFound => Status::NotFound,
            ErrorKind::InvalidInput => Status::BadRequest,
            _ => Status::Error,
        };

        Self {
            status,
            reply: Reply::failure(error.to_reply_message()),
        }
    }

    /// Credentials missing or wrong
    pub fn forbidden() -> Self {
        Self {
            status: Status::Forbidden,
            reply: Reply::failure("Incorrect credentials"),
        }
    }

    /// Payload could not be decoded
    pub fn bad_request() -> Self {
        Self {
            status: Status::BadRequest,
            reply: Reply::failure("Cannot decode request"),
        }
    }

    /// Create an ERROR response with a bare message
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            reply: Reply::failure(message),
        }
    }

    /// Credentials accepted
    pub fn authenticated() -> Self {
        Self::ok(Reply::success("Authenticated", 0, Keystore::new()))
    }

    pub fn pong() -> Self {
        Self::ok(Reply::success("PONG", 0, Keystore::new()))
    }

    pub fn is_success(&self) -> bool {
        self.reply.success
    }
}
