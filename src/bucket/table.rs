//! Bucket implementation
//!
//! BTreeMap-based key/value namespace.

use std::collections::btree_map;
use std::collections::BTreeMap;

/// A uniquely-keyed, ordered namespace of entries
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,

    /// Approximate size of keys and values in bytes
    size: usize,
}

impl Bucket {
    /// Create a new empty bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Insert or replace a value, returning the previous one
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Option<Vec<u8>> {
        let added = key.len() + value.len();
        let key_len = key.len();
        let previous = self.entries.insert(key, value);

        self.size += added;
        if let Some(old) = &previous {
            self.size -= key_len + old.len();
        }
        previous
    }

    /// Remove a key, returning the value it held
    pub fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let removed = self.entries.remove(key);
        if let Some(old) = &removed {
            self.size -= key.len() + old.len();
        }
        removed
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Approximate size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Iterate over all entries in sorted key order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }
}

/// Iterator over bucket entries
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, Vec<u8>, Vec<u8>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}
