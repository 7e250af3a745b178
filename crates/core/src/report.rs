//! Final status report
//!
//! Produced by an engine once the driver stops. Serializable for the CLI's
//! JSON output; [`Display`](std::fmt::Display) renders the human-readable
//! form.

use crate::transaction::{Transaction, TransactionStatus};
use crate::types::{Algorithm, ResourceKey, Timestamp, TxnId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReport {
    /// Transaction id
    pub id: TxnId,
    /// Final status
    pub status: TransactionStatus,
    /// Timestamp (start timestamp for optimistic transactions)
    pub timestamp: Timestamp,
    /// Validation timestamp (optimistic only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<Timestamp>,
    /// Finish timestamp (optimistic only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    /// Number of restarts after aborts
    pub restarts: u32,
}

impl TransactionReport {
    /// Check if the transaction committed
    pub fn finished(&self) -> bool {
        self.status == TransactionStatus::Committed
    }
}

impl From<&Transaction> for TransactionReport {
    fn from(txn: &Transaction) -> Self {
        TransactionReport {
            id: txn.id().clone(),
            status: txn.status(),
            timestamp: txn.timestamp(),
            validated_at: txn.validated_at(),
            finished_at: txn.finished_at(),
            restarts: txn.restarts(),
        }
    }
}

/// One version of a resource under multiversion timestamp ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReport {
    /// Write timestamp (creation timestamp)
    pub write_ts: Timestamp,
    /// Highest timestamp that has read this version
    pub read_ts: Timestamp,
    /// Value held by the version
    pub value: i64,
    /// Creator, `None` for the initial version
    pub creator: Option<TxnId>,
    /// Whether the creator has committed
    pub committed: bool,
}

/// All versions of one resource, ordered by write timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVersions {
    /// Resource key
    pub resource: ResourceKey,
    /// Versions, oldest first
    pub versions: Vec<VersionReport>,
}

/// Final data dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entries", rename_all = "lowercase")]
pub enum DataSnapshot {
    /// Single-valued resources (locking and optimistic engines)
    Resources(Vec<(ResourceKey, i64)>),
    /// Version chains (multiversion engine)
    Versions(Vec<ResourceVersions>),
}

/// Final report of a simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Algorithm that produced the report
    pub algorithm: Algorithm,
    /// Transactions in first-seen order
    pub transactions: Vec<TransactionReport>,
    /// Final data
    pub data: DataSnapshot,
}

impl StatusReport {
    /// Report entry for a transaction
    pub fn transaction(&self, id: &str) -> Option<&TransactionReport> {
        self.transactions.iter().find(|t| t.id.as_str() == id)
    }

    /// Final value of a resource (single-valued engines) or of its newest
    /// committed version (multiversion engine)
    pub fn value_of(&self, resource: &str) -> Option<i64> {
        match &self.data {
            DataSnapshot::Resources(values) => values
                .iter()
                .find(|(key, _)| key == resource)
                .map(|(_, v)| *v),
            DataSnapshot::Versions(chains) => chains
                .iter()
                .find(|c| c.resource == resource)
                .and_then(|c| {
                    c.versions
                        .iter()
                        .rev()
                        .find(|v| v.committed || v.creator.is_none())
                })
                .map(|v| v.value),
        }
    }

    /// Check if every transaction committed
    pub fn all_finished(&self) -> bool {
        self.transactions.iter().all(TransactionReport::finished)
    }
}

fn opt_ts(ts: Option<Timestamp>) -> String {
    ts.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] stopped with status:", self.algorithm)?;
        for t in &self.transactions {
            let state = if t.finished() { "finished" } else { "still going" };
            match self.algorithm {
                Algorithm::Optimistic => writeln!(
                    f,
                    "  ( Transaction ID: {}, Start-Timestamp: {}, Validation-Timestamp: {}, Finish-Timestamp: {}, Status: {} )",
                    t.id,
                    t.timestamp,
                    opt_ts(t.validated_at),
                    opt_ts(t.finished_at),
                    state
                )?,
                _ => writeln!(
                    f,
                    "  ( Transaction ID: {}, Timestamp: {}, Status: {} )",
                    t.id, t.timestamp, state
                )?,
            }
        }

        writeln!(f, "[ Resource snapshot ]")?;
        match &self.data {
            DataSnapshot::Resources(values) if values.is_empty() => writeln!(f, "  No resource data")?,
            DataSnapshot::Resources(values) => {
                for (key, value) in values {
                    writeln!(f, "  {} = {}", key, value)?;
                }
            }
            DataSnapshot::Versions(chains) if chains.is_empty() => writeln!(f, "  No resource data")?,
            DataSnapshot::Versions(chains) => {
                for chain in chains {
                    writeln!(f, "  Versions of resource {}:", chain.resource)?;
                    for v in &chain.versions {
                        writeln!(
                            f,
                            "    ( Write-Timestamp: {}, Read-Timestamp: {}, Content-Value: {} )",
                            v.write_ts, v.read_ts, v.value
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}
