//! Instruction model
//!
//! An [`Instruction`] is one line of the trace: the owning transaction plus
//! an [`Operation`]. Instructions are immutable once parsed; engines keep
//! clones of them in per-transaction done-logs so they can be replayed after
//! an abort.

use crate::types::{ResourceKey, TxnId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an instruction does
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    /// Read the current value of a resource
    Read {
        /// Resource being read
        resource: ResourceKey,
    },
    /// Overwrite a resource with a new value
    Write {
        /// Resource being written
        resource: ResourceKey,
        /// New value
        value: i64,
    },
    /// Commit the owning transaction
    Commit,
}

/// One trace instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// Owning transaction
    pub txn: TxnId,
    /// Operation to perform
    pub op: Operation,
}

impl Instruction {
    /// `R txn resource`
    pub fn read(txn: impl Into<TxnId>, resource: impl Into<ResourceKey>) -> Self {
        Instruction {
            txn: txn.into(),
            op: Operation::Read {
                resource: resource.into(),
            },
        }
    }

    /// `W txn resource=value`
    pub fn write(txn: impl Into<TxnId>, resource: impl Into<ResourceKey>, value: i64) -> Self {
        Instruction {
            txn: txn.into(),
            op: Operation::Write {
                resource: resource.into(),
                value,
            },
        }
    }

    /// `C txn`
    pub fn commit(txn: impl Into<TxnId>) -> Self {
        Instruction {
            txn: txn.into(),
            op: Operation::Commit,
        }
    }

    /// Resource touched by this instruction, if any
    pub fn resource(&self) -> Option<&str> {
        match &self.op {
            Operation::Read { resource } | Operation::Write { resource, .. } => Some(resource),
            Operation::Commit => None,
        }
    }

    /// Check if this is a commit
    pub fn is_commit(&self) -> bool {
        matches!(self.op, Operation::Commit)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            Operation::Read { resource } => write!(f, "R({}) from {}", resource, self.txn),
            Operation::Write { resource, value } => {
                write!(f, "W({}={}) from {}", resource, value, self.txn)
            }
            Operation::Commit => write!(f, "commit from {}", self.txn),
        }
    }
}
