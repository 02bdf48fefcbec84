//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Framed Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: AUTH   - Payload: username, password
//! - 0x02: WRITE  - Payload: db, bucket, keystore (keys + values)
//! - 0x03: READ   - Payload: db, bucket, keystore (keys only; empty = all)
//! - 0x04: DELETE - Payload: db, bucket, keystore (keys only)
//! - 0x05: PING   - Payload: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │ success, message, count, kv │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND (bucket does not exist)
//! - 0x02: ERROR
//! - 0x03: FORBIDDEN
//! - 0x04: BAD_REQUEST

mod codec;
mod command;
mod response;

pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType, Request, Verb};
pub use response::{Reply, Response, Status};
