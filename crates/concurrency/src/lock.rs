//! Lock table for two-phase locking
//!
//! Tracks share/exclusive locks per resource and per transaction. Per
//! resource there is either at most one exclusive holder or any number of
//! share holders, never both. A transaction holds at most one lock per
//! resource; asking for exclusive while holding share upgrades it in place.

use ccsim_core::{ResourceKey, TxnId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::engine::Conflict;

/// Lock modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockMode {
    /// Shared lock for reading
    Share,
    /// Exclusive lock for writing
    Exclusive,
}

impl LockMode {
    /// Check if two lock modes are compatible
    pub fn is_compatible_with(&self, other: LockMode) -> bool {
        matches!((*self, other), (LockMode::Share, LockMode::Share))
    }

    /// Check if holding `self` already satisfies a request for `wanted`
    pub fn covers(&self, wanted: LockMode) -> bool {
        *self == LockMode::Exclusive || wanted == LockMode::Share
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Share => f.write_str("share"),
            LockMode::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// How a successful request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockGrant {
    /// A lock at least as strong was already held
    AlreadyHeld,
    /// A new lock was granted
    Granted,
    /// A share lock was upgraded to exclusive
    Upgraded,
}

#[derive(Debug, Clone)]
struct LockEntry {
    holder: TxnId,
    mode: LockMode,
}

/// Lock table indexed by resource and by transaction
#[derive(Debug, Default)]
pub struct LockTable {
    by_resource: FxHashMap<ResourceKey, SmallVec<[LockEntry; 4]>>,
    by_txn: FxHashMap<TxnId, Vec<ResourceKey>>,
}

impl LockTable {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode held by `txn` on `resource`, if any
    pub fn mode_held(&self, txn: &TxnId, resource: &str) -> Option<LockMode> {
        self.by_resource
            .get(resource)?
            .iter()
            .find(|e| &e.holder == txn)
            .map(|e| e.mode)
    }

    /// Other transactions whose locks on `resource` conflict with `mode`
    pub fn conflicting_holders(&self, txn: &TxnId, resource: &str, mode: LockMode) -> Vec<TxnId> {
        match self.by_resource.get(resource) {
            Some(holders) => holders
                .iter()
                .filter(|e| &e.holder != txn && !e.mode.is_compatible_with(mode))
                .map(|e| e.holder.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Acquire a share lock (no-op if any lock is already held)
    pub fn acquire_share(&mut self, txn: &TxnId, resource: &str) -> Result<LockGrant, Conflict> {
        self.acquire(txn, resource, LockMode::Share)
    }

    /// Acquire an exclusive lock, upgrading a held share lock
    pub fn acquire_exclusive(
        &mut self,
        txn: &TxnId,
        resource: &str,
    ) -> Result<LockGrant, Conflict> {
        self.acquire(txn, resource, LockMode::Exclusive)
    }

    fn acquire(&mut self, txn: &TxnId, resource: &str, mode: LockMode) -> Result<LockGrant, Conflict> {
        let held = self.mode_held(txn, resource);
        if held.map_or(false, |h| h.covers(mode)) {
            return Ok(LockGrant::AlreadyHeld);
        }

        let holders = self.conflicting_holders(txn, resource, mode);
        if !holders.is_empty() {
            return Err(Conflict::Lock {
                resource: resource.to_string(),
                mode,
                holders,
            });
        }

        let entries = self.by_resource.entry(resource.to_string()).or_default();
        match entries.iter_mut().find(|e| &e.holder == txn) {
            Some(entry) => {
                entry.mode = mode;
                Ok(LockGrant::Upgraded)
            }
            None => {
                entries.push(LockEntry {
                    holder: txn.clone(),
                    mode,
                });
                self.by_txn
                    .entry(txn.clone())
                    .or_default()
                    .push(resource.to_string());
                Ok(LockGrant::Granted)
            }
        }
    }

    /// Release every lock held by `txn`; returns the released resources
    pub fn release_all(&mut self, txn: &TxnId) -> Vec<ResourceKey> {
        let resources = self.by_txn.remove(txn).unwrap_or_default();
        for resource in &resources {
            if let Some(entries) = self.by_resource.get_mut(resource) {
                entries.retain(|e| &e.holder != txn);
                if entries.is_empty() {
                    self.by_resource.remove(resource);
                }
            }
        }
        resources
    }

    /// All holders of `resource` with their modes
    pub fn holders(&self, resource: &str) -> Vec<(TxnId, LockMode)> {
        self.by_resource
            .get(resource)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| (e.holder.clone(), e.mode))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resources locked by `txn`
    pub fn locks_held_by(&self, txn: &TxnId) -> &[ResourceKey] {
        self.by_txn.get(txn).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if `txn` holds any lock
    pub fn has_locks(&self, txn: &TxnId) -> bool {
        !self.locks_held_by(txn).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(id: &str) -> TxnId {
        TxnId::new(id)
    }

    fn assert_exclusivity(table: &LockTable, resource: &str) {
        let holders = table.holders(resource);
        let exclusive = holders
            .iter()
            .filter(|(_, m)| *m == LockMode::Exclusive)
            .count();
        assert!(exclusive <= 1, "two exclusive holders on {}", resource);
        if exclusive == 1 {
            assert_eq!(holders.len(), 1, "share holder next to exclusive on {}", resource);
        }
    }

    #[test]
    fn test_lock_compatibility() {
        assert!(LockMode::Share.is_compatible_with(LockMode::Share));
        assert!(!LockMode::Share.is_compatible_with(LockMode::Exclusive));
        assert!(!LockMode::Exclusive.is_compatible_with(LockMode::Share));
        assert!(!LockMode::Exclusive.is_compatible_with(LockMode::Exclusive));
    }

    #[test]
    fn test_shared_locks_coexist() {
        let mut table = LockTable::new();
        assert_eq!(table.acquire_share(&t("T1"), "X"), Ok(LockGrant::Granted));
        assert_eq!(table.acquire_share(&t("T2"), "X"), Ok(LockGrant::Granted));
        assert_eq!(table.holders("X").len(), 2);
    }

    #[test]
    fn test_exclusive_conflicts_report_holders() {
        let mut table = LockTable::new();
        table.acquire_share(&t("T1"), "X").unwrap();
        table.acquire_share(&t("T2"), "X").unwrap();

        match table.acquire_exclusive(&t("T3"), "X") {
            Err(Conflict::Lock { holders, mode, .. }) => {
                assert_eq!(mode, LockMode::Exclusive);
                assert_eq!(holders, vec![t("T1"), t("T2")]);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_upgrade_in_place() {
        let mut table = LockTable::new();
        table.acquire_share(&t("T1"), "X").unwrap();
        assert_eq!(table.acquire_exclusive(&t("T1"), "X"), Ok(LockGrant::Upgraded));
        assert_eq!(table.holders("X"), vec![(t("T1"), LockMode::Exclusive)]);
        assert_eq!(table.locks_held_by(&t("T1")).len(), 1);
    }

    #[test]
    fn test_upgrade_blocked_by_co_holder() {
        let mut table = LockTable::new();
        table.acquire_share(&t("T1"), "X").unwrap();
        table.acquire_share(&t("T2"), "X").unwrap();
        match table.acquire_exclusive(&t("T1"), "X") {
            Err(Conflict::Lock { holders, .. }) => assert_eq!(holders, vec![t("T2")]),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(table.mode_held(&t("T1"), "X"), Some(LockMode::Share));
    }

    #[test]
    fn test_exclusive_covers_share() {
        let mut table = LockTable::new();
        table.acquire_exclusive(&t("T1"), "X").unwrap();
        assert_eq!(table.acquire_share(&t("T1"), "X"), Ok(LockGrant::AlreadyHeld));
        assert_eq!(table.acquire_exclusive(&t("T1"), "X"), Ok(LockGrant::AlreadyHeld));
        assert!(table.acquire_share(&t("T2"), "X").is_err());
    }

    #[test]
    fn test_release_all() {
        let mut table = LockTable::new();
        table.acquire_exclusive(&t("T1"), "X").unwrap();
        table.acquire_share(&t("T1"), "Y").unwrap();
        table.acquire_share(&t("T2"), "Y").unwrap();

        let released = table.release_all(&t("T1"));
        assert_eq!(released, vec!["X".to_string(), "Y".to_string()]);
        assert!(!table.has_locks(&t("T1")));
        assert!(table.holders("X").is_empty());
        assert_eq!(table.holders("Y"), vec![(t("T2"), LockMode::Share)]);
        assert_eq!(table.acquire_exclusive(&t("T3"), "X"), Ok(LockGrant::Granted));
    }

    proptest! {
        #[test]
        fn prop_lock_exclusivity(
            ops in prop::collection::vec((0u8..4, 0u8..3, any::<bool>(), 0u8..10), 1..60)
        ) {
            let mut table = LockTable::new();
            let resources = ["X", "Y", "Z"];
            for (txn, res, exclusive, release) in ops {
                let id = TxnId::new(format!("T{}", txn));
                let resource = resources[res as usize];
                if release == 0 {
                    table.release_all(&id);
                } else if exclusive {
                    let _ = table.acquire_exclusive(&id, resource);
                } else {
                    let _ = table.acquire_share(&id, resource);
                }
                for r in resources {
                    assert_exclusivity(&table, r);
                }
            }
        }
    }
}
