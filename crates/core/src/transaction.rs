//! Transaction status machine and registry
//!
//! ```text
//!            wait()               roll_back()
//!   Active ---------> Waiting --------------+
//!     ^  <---------               |         v
//!     |    unwait()               +----> Aborting
//!     |                                     |
//!     +------------- restart() -------------+
//!     |
//!     +-- commit() --> Committed (terminal)
//! ```
//!
//! A transaction is never Waiting and Aborting at once: aborting a waiting
//! transaction replaces the Waiting state. Every illegal transition is an
//! [`Error::Internal`].

use crate::error::{Error, Result};
use crate::types::{LogicalClock, Timestamp, TxnId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Executing instructions
    Active,
    /// Blocked on a resource; its next instruction sits in a wait-queue
    Waiting,
    /// Chosen for rollback; its instructions sit in the rollback-queue
    Aborting,
    /// Finished (terminal)
    Committed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Active => "active",
            TransactionStatus::Waiting => "waiting",
            TransactionStatus::Aborting => "aborting",
            TransactionStatus::Committed => "committed",
        };
        f.write_str(s)
    }
}

/// How a transaction's timestamp behaves across restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampDiscipline {
    /// Assigned once at the first instruction (wound-wait priority)
    Static,
    /// Redrawn every time the transaction restarts after a rollback
    Dynamic,
}

/// A simulated transaction
#[derive(Debug, Clone)]
pub struct Transaction {
    id: TxnId,
    status: TransactionStatus,
    discipline: TimestampDiscipline,
    timestamp: Timestamp,
    validated_at: Option<Timestamp>,
    finished_at: Option<Timestamp>,
    restarts: u32,
}

impl Transaction {
    /// Create an Active transaction stamped with the clock's next tick
    pub fn new(
        id: TxnId,
        discipline: TimestampDiscipline,
        clock: &mut LogicalClock,
    ) -> Result<Self> {
        Ok(Transaction {
            id,
            status: TransactionStatus::Active,
            discipline,
            timestamp: clock.tick()?,
            validated_at: None,
            finished_at: None,
            restarts: 0,
        })
    }

    /// Transaction id
    pub fn id(&self) -> &TxnId {
        &self.id
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Current timestamp (start timestamp for optimistic transactions)
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Timestamp discipline
    pub fn discipline(&self) -> TimestampDiscipline {
        self.discipline
    }

    /// Validation timestamp, once stamped
    pub fn validated_at(&self) -> Option<Timestamp> {
        self.validated_at
    }

    /// Finish timestamp, once stamped
    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    /// Number of times this transaction has been restarted after an abort
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Check if the transaction can execute instructions right now
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Check if the transaction has committed
    pub fn is_committed(&self) -> bool {
        self.status == TransactionStatus::Committed
    }

    /// Active → Waiting
    pub fn wait(&mut self) -> Result<()> {
        self.transition(TransactionStatus::Active, TransactionStatus::Waiting)
    }

    /// Waiting → Active
    pub fn unwait(&mut self) -> Result<()> {
        self.transition(TransactionStatus::Waiting, TransactionStatus::Active)
    }

    /// Active | Waiting → Aborting
    pub fn roll_back(&mut self) -> Result<()> {
        match self.status {
            TransactionStatus::Active | TransactionStatus::Waiting => {
                self.status = TransactionStatus::Aborting;
                self.validated_at = None;
                self.finished_at = None;
                Ok(())
            }
            other => Err(self.illegal(other, TransactionStatus::Aborting)),
        }
    }

    /// Aborting → Active
    ///
    /// Dynamic-timestamp transactions draw a fresh timestamp from `clock`, so
    /// the restarted attempt is ordered after everything already stamped.
    pub fn restart(&mut self, clock: &mut LogicalClock) -> Result<()> {
        self.transition(TransactionStatus::Aborting, TransactionStatus::Active)?;
        self.restarts += 1;
        if self.discipline == TimestampDiscipline::Dynamic {
            self.timestamp = clock.tick()?;
        }
        Ok(())
    }

    /// Active → Committed
    pub fn commit(&mut self) -> Result<()> {
        self.transition(TransactionStatus::Active, TransactionStatus::Committed)
    }

    /// Record the validation timestamp of the current attempt
    pub fn stamp_validation(&mut self, ts: Timestamp) {
        self.validated_at = Some(ts);
    }

    /// Record the finish timestamp of the current attempt
    pub fn stamp_finish(&mut self, ts: Timestamp) {
        self.finished_at = Some(ts);
    }

    fn transition(&mut self, from: TransactionStatus, to: TransactionStatus) -> Result<()> {
        if self.status != from {
            return Err(self.illegal(self.status, to));
        }
        self.status = to;
        Ok(())
    }

    fn illegal(&self, from: TransactionStatus, to: TransactionStatus) -> Error {
        Error::Internal(format!(
            "transaction {} cannot move from {} to {}",
            self.id, from, to
        ))
    }
}

/// Registry of every transaction seen during a run
///
/// Transactions are kept forever (for the final report) in first-seen order.
#[derive(Debug, Clone)]
pub struct TransactionTable {
    discipline: TimestampDiscipline,
    order: Vec<Transaction>,
    index: HashMap<TxnId, usize>,
}

impl TransactionTable {
    /// Create an empty table whose transactions use `discipline`
    pub fn new(discipline: TimestampDiscipline) -> Self {
        TransactionTable {
            discipline,
            order: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register `id` if unseen; returns true when a transaction was created
    pub fn register(&mut self, id: &TxnId, clock: &mut LogicalClock) -> Result<bool> {
        if self.index.contains_key(id) {
            return Ok(false);
        }
        let txn = Transaction::new(id.clone(), self.discipline, clock)?;
        self.index.insert(id.clone(), self.order.len());
        self.order.push(txn);
        Ok(true)
    }

    /// Look up a transaction
    pub fn get(&self, id: &TxnId) -> Option<&Transaction> {
        self.index.get(id).map(|&i| &self.order[i])
    }

    /// Look up a transaction mutably
    pub fn get_mut(&mut self, id: &TxnId) -> Option<&mut Transaction> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.order[i]),
            None => None,
        }
    }

    /// Look up a transaction that must exist
    pub fn expect(&self, id: &TxnId) -> Result<&Transaction> {
        self.get(id)
            .ok_or_else(|| Error::Internal(format!("unknown transaction {}", id)))
    }

    /// Look up a transaction that must exist, mutably
    pub fn expect_mut(&mut self, id: &TxnId) -> Result<&mut Transaction> {
        self.get_mut(id)
            .ok_or_else(|| Error::Internal(format!("unknown transaction {}", id)))
    }

    /// Current status of a transaction that must exist
    pub fn status(&self, id: &TxnId) -> Result<TransactionStatus> {
        self.expect(id).map(Transaction::status)
    }

    /// Timestamp of a transaction that must exist
    pub fn timestamp(&self, id: &TxnId) -> Result<Timestamp> {
        self.expect(id).map(Transaction::timestamp)
    }

    /// Iterate in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.order.iter()
    }

    /// Number of registered transactions
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no transaction has been registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
