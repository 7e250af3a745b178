//! Version chains for multiversion timestamp ordering
//!
//! Every resource owns a chain of versions ordered by write timestamp. The
//! chain always starts with an initial version at [`Timestamp::ZERO`]
//! holding 0, so every read or write at a positive timestamp finds a
//! version at or below it.
//!
//! Reads of another transaction's uncommitted version are recorded in a
//! [`DependencyGraph`]; the reflexive-transitive closure of that graph is
//! the set of transactions a rollback must cascade to.

use ccsim_core::{Error, ResourceKey, ResourceVersions, Result, Timestamp, TxnId, VersionReport};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::engine::Conflict;

/// One version of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceVersion {
    /// Creating transaction, `None` for the initial version
    pub creator: Option<TxnId>,
    /// Timestamp of the creating write
    pub write_ts: Timestamp,
    /// Highest timestamp that has read this version
    pub read_ts: Timestamp,
    /// Stored value
    pub value: i64,
    /// Whether the creator has committed
    pub committed: bool,
}

impl ResourceVersion {
    fn initial() -> Self {
        ResourceVersion {
            creator: None,
            write_ts: Timestamp::ZERO,
            read_ts: Timestamp::ZERO,
            value: 0,
            committed: true,
        }
    }

    fn created_by(&self, txn: &TxnId) -> bool {
        self.creator.as_ref() == Some(txn)
    }
}

impl From<&ResourceVersion> for VersionReport {
    fn from(v: &ResourceVersion) -> Self {
        VersionReport {
            write_ts: v.write_ts,
            read_ts: v.read_ts,
            value: v.value,
            creator: v.creator.clone(),
            committed: v.committed,
        }
    }
}

/// Effect of an accepted write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEffect {
    /// A new version was inserted
    Created,
    /// The writer's own version at the same timestamp was updated
    Overwritten,
}

/// Reads of uncommitted versions, as creator → reader edges
///
/// Both directions are stored and only mutated through [`add_edge`] and
/// [`remove`], which keep them mirrored.
///
/// [`add_edge`]: DependencyGraph::add_edge
/// [`remove`]: DependencyGraph::remove
#[derive(Debug, Default)]
pub struct DependencyGraph {
    readers: FxHashMap<TxnId, BTreeSet<TxnId>>,
    readings: FxHashMap<TxnId, BTreeSet<TxnId>>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `reader` read a version created by `creator`
    pub fn add_edge(&mut self, creator: &TxnId, reader: &TxnId) {
        self.readers
            .entry(creator.clone())
            .or_default()
            .insert(reader.clone());
        self.readings
            .entry(reader.clone())
            .or_default()
            .insert(creator.clone());
    }

    /// Transactions that read a version created by `creator`
    pub fn readers_of(&self, creator: &TxnId) -> impl Iterator<Item = &TxnId> {
        self.readers.get(creator).into_iter().flatten()
    }

    #[cfg(test)]
    fn readings_of(&self, reader: &TxnId) -> impl Iterator<Item = &TxnId> {
        self.readings.get(reader).into_iter().flatten()
    }

    /// Check if `txn` appears in any edge
    pub fn mentions(&self, txn: &TxnId) -> bool {
        self.readers.contains_key(txn)
            || self.readings.contains_key(txn)
            || self.readers.values().any(|set| set.contains(txn))
            || self.readings.values().any(|set| set.contains(txn))
    }

    /// Reflexive-transitive closure of the reader relation from `start`,
    /// in breadth-first order with `start` first
    pub fn closure(&self, start: &TxnId) -> Vec<TxnId> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut frontier = VecDeque::from([start.clone()]);
        while let Some(txn) = frontier.pop_front() {
            if !seen.insert(txn.clone()) {
                continue;
            }
            frontier.extend(self.readers_of(&txn).cloned());
            order.push(txn);
        }
        order
    }

    /// Drop every edge where `txn` is creator or reader
    pub fn remove(&mut self, txn: &TxnId) {
        for reader in self.readers.remove(txn).unwrap_or_default() {
            if let Some(set) = self.readings.get_mut(&reader) {
                set.remove(txn);
                if set.is_empty() {
                    self.readings.remove(&reader);
                }
            }
        }
        for creator in self.readings.remove(txn).unwrap_or_default() {
            if let Some(set) = self.readers.get_mut(&creator) {
                set.remove(txn);
                if set.is_empty() {
                    self.readers.remove(&creator);
                }
            }
        }
    }
}

/// Version chains plus the dependency graph over them
#[derive(Debug, Default)]
pub struct VersionStore {
    chains: BTreeMap<ResourceKey, Vec<ResourceVersion>>,
    created: FxHashMap<TxnId, BTreeSet<ResourceKey>>,
    graph: DependencyGraph,
}

impl VersionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn chain_mut(&mut self, resource: &str) -> &mut Vec<ResourceVersion> {
        self.chains
            .entry(resource.to_string())
            .or_insert_with(|| vec![ResourceVersion::initial()])
    }

    /// Index of the version with the greatest write timestamp at or below `ts`
    fn locate(chain: &[ResourceVersion], resource: &str, ts: Timestamp) -> Result<usize> {
        match chain.partition_point(|v| v.write_ts <= ts) {
            0 => Err(Error::Internal(format!(
                "no version of {} at or below {}",
                resource, ts
            ))),
            n => Ok(n - 1),
        }
    }

    /// Read `resource` as `txn` at `ts`
    pub fn read(&mut self, txn: &TxnId, ts: Timestamp, resource: &str) -> Result<i64> {
        let chain = self.chain_mut(resource);
        let idx = Self::locate(chain, resource, ts)?;
        let version = &mut chain[idx];
        version.read_ts = version.read_ts.max(ts);
        let value = version.value;
        let creator = match &version.creator {
            Some(c) if c != txn && !version.committed => Some(c.clone()),
            _ => None,
        };
        if let Some(creator) = creator {
            self.graph.add_edge(&creator, txn);
        }
        Ok(value)
    }

    /// Write `value` to `resource` as `txn` at `ts`
    ///
    /// The outer error is an invariant violation; the inner one is the
    /// conflict raised when a later timestamp already read the version this
    /// write would supersede.
    pub fn write(
        &mut self,
        txn: &TxnId,
        ts: Timestamp,
        resource: &str,
        value: i64,
    ) -> Result<std::result::Result<WriteEffect, Conflict>> {
        let chain = self.chain_mut(resource);
        let idx = Self::locate(chain, resource, ts)?;
        let below = &mut chain[idx];

        if below.read_ts > ts {
            return Ok(Err(Conflict::ForbiddenTimestampWrite {
                resource: resource.to_string(),
                write_ts: ts,
                read_ts: below.read_ts,
            }));
        }

        if below.write_ts == ts {
            if !below.created_by(txn) {
                return Err(Error::Internal(format!(
                    "{} and {:?} share timestamp {} on {}",
                    txn, below.creator, ts, resource
                )));
            }
            below.value = value;
            return Ok(Ok(WriteEffect::Overwritten));
        }

        chain.insert(
            idx + 1,
            ResourceVersion {
                creator: Some(txn.clone()),
                write_ts: ts,
                read_ts: ts,
                value,
                committed: false,
            },
        );
        self.created
            .entry(txn.clone())
            .or_default()
            .insert(resource.to_string());
        Ok(Ok(WriteEffect::Created))
    }

    /// Mark every version created by `txn` committed and drop its edges
    pub fn commit(&mut self, txn: &TxnId) {
        for resource in self.created.remove(txn).unwrap_or_default() {
            if let Some(chain) = self.chains.get_mut(&resource) {
                chain
                    .iter_mut()
                    .filter(|v| v.created_by(txn))
                    .for_each(|v| v.committed = true);
            }
        }
        self.graph.remove(txn);
    }

    /// Delete every version created by `txn` and drop its edges
    pub fn rollback(&mut self, txn: &TxnId) -> usize {
        let mut removed = 0;
        for resource in self.created.remove(txn).unwrap_or_default() {
            if let Some(chain) = self.chains.get_mut(&resource) {
                let before = chain.len();
                chain.retain(|v| !v.created_by(txn));
                removed += before - chain.len();
            }
        }
        self.graph.remove(txn);
        removed
    }

    /// Transactions a rollback of `txn` must cascade to, `txn` first
    pub fn cascade_set(&self, txn: &TxnId) -> Vec<TxnId> {
        self.graph.closure(txn)
    }

    /// Dependency graph
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Versions of `resource`, oldest first
    pub fn versions(&self, resource: &str) -> &[ResourceVersion] {
        self.chains.get(resource).map(Vec::as_slice).unwrap_or(&[])
    }

    #[cfg(test)]
    fn has_versions_of(&self, txn: &TxnId) -> bool {
        self.chains
            .values()
            .flatten()
            .any(|v| v.created_by(txn))
    }

    /// Every chain, sorted by resource
    pub fn snapshot(&self) -> Vec<ResourceVersions> {
        self.chains
            .iter()
            .map(|(resource, chain)| ResourceVersions {
                resource: resource.clone(),
                versions: chain.iter().map(VersionReport::from).collect(),
            })
            .collect()
    }
}
