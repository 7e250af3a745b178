//! The engine capability shared by every concurrency-control discipline
//!
//! The driver only ever talks to a `Box<dyn ConcurrencyControl>`; which
//! discipline sits behind it is chosen once, at startup.

use ccsim_core::{Algorithm, Instruction, ResourceKey, Result, StatusReport, Timestamp, TxnId};
use thiserror::Error;

use crate::lock::LockMode;

/// Conflict signal raised by a lock table, validator or version store
///
/// Conflicts are expected control flow. The engine that owns the structure
/// resolves each one (wait, wound, abort, cascade) and it never leaves the
/// engine as an [`ccsim_core::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    /// Requested lock is incompatible with locks held by other transactions
    #[error("lock conflict on {resource} ({mode} requested), held by {holders:?}")]
    Lock {
        /// Resource being locked
        resource: ResourceKey,
        /// Mode that was requested
        mode: LockMode,
        /// Other transactions holding a conflicting lock
        holders: Vec<TxnId>,
    },

    /// Optimistic validation failed against a transaction that finished
    /// while the committer was running
    #[error("validation failed against {against} on {resources:?}")]
    FailedValidation {
        /// Transaction whose write set overlaps
        against: TxnId,
        /// Overlapping resources
        resources: Vec<ResourceKey>,
    },

    /// Write would invalidate a read already made by a later timestamp
    #[error("forbidden write on {resource} at {write_ts}: already read at {read_ts}")]
    ForbiddenTimestampWrite {
        /// Resource being written
        resource: ResourceKey,
        /// Timestamp of the writer
        write_ts: Timestamp,
        /// Read timestamp of the version it would overwrite
        read_ts: Timestamp,
    },
}

/// What happened to an instruction handed to [`ConcurrencyControl::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The instruction took effect
    Applied,
    /// The instruction is blocked and parked in the wait-queue
    Waiting(Conflict),
    /// The owning transaction was aborted; its work is scheduled for replay
    Aborted(Conflict),
    /// Queued behind the transaction's own pending work without an attempt
    Deferred,
    /// The transaction already committed; the instruction was dropped
    Ignored,
}

impl Outcome {
    /// Check if the instruction took effect
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    /// The conflict that prevented the instruction from applying, if any
    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            Outcome::Waiting(c) | Outcome::Aborted(c) => Some(c),
            _ => None,
        }
    }
}

/// Tunables shared by every engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// First logical timestamp handed out
    pub clock_start: u64,
    /// Opt-in bound on rollback replays; `None` leaves replay unbounded
    pub max_replays: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            clock_start: 1,
            max_replays: None,
        }
    }
}

/// A concurrency-control discipline
pub trait ConcurrencyControl {
    /// Which discipline this is
    fn algorithm(&self) -> Algorithm;

    /// Execute one instruction from the feed
    ///
    /// Any follow-up work the instruction triggers (rollback replay, wait
    /// queue drains after commits) runs before this returns. Errors are
    /// fatal invariant violations only.
    fn execute(&mut self, instruction: Instruction) -> Result<Outcome>;

    /// Check if internally queued work could still make progress
    fn has_pending_work(&self) -> bool;

    /// Make progress on internally queued work
    fn resume(&mut self) -> Result<()>;

    /// Snapshot of transaction outcomes and data
    fn report(&self) -> StatusReport;
}
