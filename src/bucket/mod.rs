//! Bucket Module
//!
//! In-memory image of a database's bucket namespace.
//!
//! ## Responsibilities
//! - Hold each bucket's entries in key byte order
//! - Resolve bucket names, creating them only on the write path
//! - Apply replayed commit records
//!
//! ## Data Structure Choice
//! BTreeMap for both levels: bucket scans must come out in lexicographic
//! key order, and bucket names are few.

mod directory;
mod table;

pub use directory::{validate_bucket_name, BucketDirectory};
pub use table::Bucket;
