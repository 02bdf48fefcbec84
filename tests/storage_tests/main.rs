//! Storage layer tests
//!
//! - `record_tests`: commit record framing, reader and replay
//! - `handle_tests`: handle lifecycle, file creation, crash recovery

mod record_tests;
