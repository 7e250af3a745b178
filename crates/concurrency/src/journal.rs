//! Per-transaction bookkeeping shared by the engines
//!
//! - [`DoneLog`]: instructions a transaction has already applied, kept until
//!   it commits so they can be replayed if it aborts
//! - [`RollbackQueue`]: FIFO of aborted transactions waiting to replay

use ccsim_core::{Error, Instruction, Result, TxnId};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Applied-but-uncommitted instructions per transaction
#[derive(Debug, Default)]
pub struct DoneLog {
    entries: FxHashMap<TxnId, Vec<Instruction>>,
}

impl DoneLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an applied instruction to its transaction's log
    pub fn record(&mut self, instruction: Instruction) {
        self.entries
            .entry(instruction.txn.clone())
            .or_default()
            .push(instruction);
    }

    /// Remove and return a transaction's log, in execution order
    pub fn take(&mut self, txn: &TxnId) -> Vec<Instruction> {
        self.entries.remove(txn).unwrap_or_default()
    }

    /// Forget a transaction's log (after commit)
    pub fn clear(&mut self, txn: &TxnId) {
        self.entries.remove(txn);
    }
}

/// Instructions of one aborted transaction, in execution order
#[derive(Debug, Clone)]
pub struct RollbackEntry {
    /// Aborted transaction
    pub txn: TxnId,
    /// Instructions to replay
    pub instructions: VecDeque<Instruction>,
}

/// FIFO of aborted transactions awaiting replay
#[derive(Debug)]
pub struct RollbackQueue {
    entries: VecDeque<RollbackEntry>,
    replays: u64,
    max_replays: Option<u64>,
}

impl RollbackQueue {
    /// Create an empty queue; `max_replays` bounds how many entries may be
    /// popped over the queue's lifetime
    pub fn new(max_replays: Option<u64>) -> Self {
        RollbackQueue {
            entries: VecDeque::new(),
            replays: 0,
            max_replays,
        }
    }

    /// Enqueue an aborted transaction
    pub fn push(&mut self, txn: TxnId, instructions: impl IntoIterator<Item = Instruction>) {
        self.entries.push_back(RollbackEntry {
            txn,
            instructions: instructions.into_iter().collect(),
        });
    }

    /// Append an instruction to a queued transaction's entry
    ///
    /// Returns false when the transaction has no queued entry.
    pub fn append_to(&mut self, instruction: Instruction) -> bool {
        match self.entries.iter_mut().find(|e| e.txn == instruction.txn) {
            Some(entry) => {
                entry.instructions.push_back(instruction);
                true
            }
            None => false,
        }
    }

    /// Pop the next transaction to replay
    pub fn pop(&mut self) -> Result<Option<RollbackEntry>> {
        let Some(entry) = self.entries.pop_front() else {
            return Ok(None);
        };
        self.replays += 1;
        if let Some(max) = self.max_replays {
            if self.replays > max {
                return Err(Error::Internal(format!(
                    "rollback replay limit of {} exceeded while replaying {}",
                    max, entry.txn
                )));
            }
        }
        Ok(Some(entry))
    }

    /// Check if a transaction has a queued entry
    pub fn contains(&self, txn: &TxnId) -> bool {
        self.entries.iter().any(|e| &e.txn == txn)
    }

    /// Total entries popped so far
    pub fn replays(&self) -> u64 {
        self.replays
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
