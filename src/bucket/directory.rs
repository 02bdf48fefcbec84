//! Bucket Directory
//!
//! Maps bucket names to their namespaces. Creation and lookup are separate
//! capabilities: only the write path may bring a bucket into existence.

use std::collections::BTreeMap;

use crate::error::{KvError, Result};
use crate::storage::Op;

use super::Bucket;

/// All buckets of one database
#[derive(Debug, Clone, Default)]
pub struct BucketDirectory {
    buckets: BTreeMap<String, Bucket>,
}

impl BucketDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an existing bucket (read/delete path)
    pub fn lookup_bucket(&self, name: &str) -> Result<&Bucket> {
        validate_bucket_name(name)?;
        self.buckets.get(name).ok_or_else(|| KvError::BucketNotFound {
            bucket: name.to_string(),
        })
    }

    /// Resolve an existing bucket for mutation
    pub fn lookup_bucket_mut(&mut self, name: &str) -> Result<&mut Bucket> {
        validate_bucket_name(name)?;
        self.buckets
            .get_mut(name)
            .ok_or_else(|| KvError::BucketNotFound {
                bucket: name.to_string(),
            })
    }

    /// Resolve a bucket, creating it if absent (write path)
    ///
    /// The flag reports whether this call created the bucket.
    pub fn ensure_bucket(&mut self, name: &str) -> Result<(&mut Bucket, bool)> {
        validate_bucket_name(name)?;
        let created = !self.buckets.contains_key(name);
        let bucket = self.buckets.entry(name.to_string()).or_default();
        Ok((bucket, created))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    /// Bucket names in sorted order
    pub fn bucket_names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Buckets with their names, in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bucket)> {
        self.buckets.iter().map(|(name, bucket)| (name.as_str(), bucket))
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Apply one recorded mutation (replay and commit path)
    pub fn apply(&mut self, op: &Op) -> Result<()> {
        match op {
            Op::Reset => self.buckets.clear(),
            Op::CreateBucket { bucket } => {
                self.ensure_bucket(bucket)?;
            }
            Op::Put { bucket, key, value } => {
                let (b, _) = self.ensure_bucket(bucket)?;
                b.put(key.clone(), value.clone());
            }
            Op::Delete { bucket, key } => {
                let b = self.lookup_bucket_mut(bucket).map_err(|_| {
                    KvError::Corruption(format!(
                        "delete recorded against unknown bucket '{}'",
                        bucket
                    ))
                })?;
                b.delete(key);
            }
        }
        Ok(())
    }
}

/// Bucket names are never empty
pub fn validate_bucket_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KvError::InvalidInput("bucket name must not be empty".to_string()));
    }
    Ok(())
}
