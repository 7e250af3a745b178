//! Private workspaces for optimistic transactions
//!
//! Each transaction reads and writes a lazily populated copy of the
//! resources it touches. Once a resource is in the workspace the base store
//! is never consulted again for it during the same attempt. The store also
//! remembers the timing window and write set of recently finished
//! transactions, which backward validation needs.

use ccsim_core::{ResourceKey, ResourceStore, Timestamp, TxnId};
use rustc_hash::{FxHashMap, FxHashSet};

/// One transaction's private state for the current attempt
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    values: FxHashMap<ResourceKey, i64>,
    read_history: Vec<ResourceKey>,
    write_history: Vec<ResourceKey>,
}

impl Workspace {
    /// Resources read, in access order (duplicates kept)
    pub fn read_history(&self) -> &[ResourceKey] {
        &self.read_history
    }

    /// Resources written, in access order (duplicates kept)
    pub fn write_history(&self) -> &[ResourceKey] {
        &self.write_history
    }

    /// Private value of a resource, if touched
    pub fn value(&self, resource: &str) -> Option<i64> {
        self.values.get(resource).copied()
    }

    /// Check if nothing was read or written
    pub fn is_empty(&self) -> bool {
        self.read_history.is_empty() && self.write_history.is_empty()
    }

    /// Distinct resources read or written
    pub fn access_set(&self) -> FxHashSet<&str> {
        self.read_history
            .iter()
            .chain(self.write_history.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Window and write set of a transaction that passed validation
#[derive(Debug, Clone)]
pub struct FinishedWindow {
    /// Transaction id
    pub txn: TxnId,
    /// Start timestamp of the successful attempt
    pub start: Timestamp,
    /// Finish timestamp (end of write phase)
    pub finish: Timestamp,
    /// Resources it wrote
    pub write_set: FxHashSet<ResourceKey>,
}

/// Workspaces of running transactions plus finished windows
#[derive(Debug, Default)]
pub struct SnapshotStore {
    workspaces: FxHashMap<TxnId, Workspace>,
    finished: Vec<FinishedWindow>,
}

impl SnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read through the workspace, seeding it from `base` on first access
    pub fn read(&mut self, txn: &TxnId, resource: &str, base: &mut ResourceStore) -> i64 {
        let ws = self.workspaces.entry(txn.clone()).or_default();
        let value = match ws.values.get(resource) {
            Some(v) => *v,
            None => {
                let v = base.read(resource);
                ws.values.insert(resource.to_string(), v);
                v
            }
        };
        ws.read_history.push(resource.to_string());
        value
    }

    /// Write into the workspace; returns the previous private value, if any
    pub fn write(&mut self, txn: &TxnId, resource: &str, value: i64) -> Option<i64> {
        let ws = self.workspaces.entry(txn.clone()).or_default();
        let old = ws.values.insert(resource.to_string(), value);
        ws.write_history.push(resource.to_string());
        old
    }

    /// Workspace of a transaction
    pub fn workspace(&self, txn: &TxnId) -> Option<&Workspace> {
        self.workspaces.get(txn)
    }

    /// Drop a transaction's workspace
    pub fn discard(&mut self, txn: &TxnId) -> Option<Workspace> {
        self.workspaces.remove(txn)
    }

    /// Remember a transaction that passed validation
    pub fn record_finished(&mut self, window: FinishedWindow) {
        self.finished.push(window);
    }

    /// Finished windows still relevant to validation
    pub fn finished(&self) -> &[FinishedWindow] {
        &self.finished
    }

    /// Forget windows that finished at or before `oldest_start`; no running
    /// attempt can overlap them
    pub fn prune(&mut self, oldest_start: Option<Timestamp>) {
        match oldest_start {
            Some(start) => self.finished.retain(|w| w.finish > start),
            None => self.finished.clear(),
        }
    }
}
