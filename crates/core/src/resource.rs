//! Plain resource store
//!
//! Maps a resource key to its current integer value. Unknown keys are
//! created at `0` on first access. Two-phase locking writes into it
//! directly; optimistic concurrency control only touches it from the write
//! phase of a successful commit.

use crate::types::ResourceKey;
use std::collections::BTreeMap;

/// Key → value store with lazily created cells
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    values: BTreeMap<ResourceKey, i64>,
}

impl ResourceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a resource has been touched
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Read a resource, creating it at `0` if unseen
    pub fn read(&mut self, key: &str) -> i64 {
        *self.cell(key)
    }

    /// Write a resource and return its previous value
    pub fn write(&mut self, key: &str, value: i64) -> i64 {
        std::mem::replace(self.cell(key), value)
    }

    /// Value without creating the cell
    pub fn peek(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    /// All resources, sorted by key
    pub fn snapshot(&self) -> Vec<(ResourceKey, i64)> {
        self.values.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Number of resources touched so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if nothing has been touched
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn cell(&mut self, key: &str) -> &mut i64 {
        self.values.entry(key.to_string()).or_insert(0)
    }
}
