//! Bucket tests
//!
//! - `table_tests`: a single bucket's entries
//! - `directory_tests`: bucket resolution and record application
