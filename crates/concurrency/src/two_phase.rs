//! Two-phase locking with wound-wait deadlock avoidance
//!
//! Reads take share locks, writes take (or upgrade to) exclusive locks, and
//! commit releases everything. On a lock conflict the requester's static
//! timestamp is compared with every conflicting holder:
//!
//! - older than all of them: the holders are wounded (aborted, locks
//!   released, writes undone, instructions queued for replay) and the
//!   request is retried at once
//! - otherwise: the instruction joins the wait-queue
//!
//! After any step in which a transaction committed, the wait-queue is
//! drained once in enqueue order. Rollback replays always run to exhaustion
//! before control returns to the driver.

use ccsim_core::{
    Algorithm, DataSnapshot, Error, Instruction, LogicalClock, Operation, ResourceKey,
    ResourceStore, Result, StatusReport, TimestampDiscipline, TransactionReport, TransactionStatus,
    TransactionTable, TxnId,
};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::engine::{ConcurrencyControl, Conflict, EngineConfig, Outcome};
use crate::journal::{DoneLog, RollbackQueue};
use crate::lock::{LockGrant, LockTable};

/// Two-phase locking engine
pub struct TwoPhaseEngine {
    clock: LogicalClock,
    transactions: TransactionTable,
    locks: LockTable,
    store: ResourceStore,
    /// Before-image of every resource a transaction has overwritten
    undo: FxHashMap<TxnId, Vec<(ResourceKey, i64)>>,
    done: DoneLog,
    wait_queue: VecDeque<Instruction>,
    rollbacks: RollbackQueue,
    committed_since_drain: bool,
}

impl TwoPhaseEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub fn with_config(config: EngineConfig) -> Self {
        TwoPhaseEngine {
            clock: LogicalClock::starting_at(config.clock_start),
            transactions: TransactionTable::new(TimestampDiscipline::Static),
            locks: LockTable::new(),
            store: ResourceStore::new(),
            undo: FxHashMap::default(),
            done: DoneLog::new(),
            wait_queue: VecDeque::new(),
            rollbacks: RollbackQueue::new(config.max_replays),
            committed_since_drain: false,
        }
    }

    /// Registered transactions
    pub fn transactions(&self) -> &TransactionTable {
        &self.transactions
    }

    /// Lock table
    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Resource store
    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Instructions currently blocked, in enqueue order
    pub fn wait_queue(&self) -> impl Iterator<Item = &Instruction> {
        self.wait_queue.iter()
    }

    fn process(&mut self, instruction: Instruction) -> Result<Outcome> {
        match self.transactions.status(&instruction.txn)? {
            TransactionStatus::Active => self.attempt(instruction),
            TransactionStatus::Waiting => {
                debug!(txn = %instruction.txn, "Instruction {} queued behind waiting transaction", instruction);
                self.wait_queue.push_back(instruction);
                Ok(Outcome::Deferred)
            }
            TransactionStatus::Aborting => {
                if !self.rollbacks.append_to(instruction.clone()) {
                    return Err(Error::Internal(format!(
                        "transaction {} is aborting but has no rollback entry",
                        instruction.txn
                    )));
                }
                Ok(Outcome::Deferred)
            }
            TransactionStatus::Committed => {
                warn!(txn = %instruction.txn, "Dropping {}: transaction already committed", instruction);
                Ok(Outcome::Ignored)
            }
        }
    }

    fn attempt(&mut self, instruction: Instruction) -> Result<Outcome> {
        loop {
            match self.apply(&instruction) {
                Ok(()) => {
                    if instruction.is_commit() {
                        self.finish_commit(&instruction.txn)?;
                    } else {
                        self.done.record(instruction);
                    }
                    return Ok(Outcome::Applied);
                }
                Err(conflict) => {
                    let holders = match &conflict {
                        Conflict::Lock { holders, .. } => holders.clone(),
                        other => {
                            return Err(Error::Internal(format!(
                                "unexpected conflict under two-phase locking: {}",
                                other
                            )))
                        }
                    };

                    if self.is_oldest(&instruction.txn, &holders)? {
                        info!(txn = %instruction.txn, victims = ?holders, "Transaction wounds younger lock holders");
                        for victim in &holders {
                            self.abort(victim)?;
                        }
                        continue;
                    }

                    self.transactions.expect_mut(&instruction.txn)?.wait()?;
                    info!(txn = %instruction.txn, "Instruction {} entered wait-queue", instruction);
                    self.wait_queue.push_back(instruction);
                    return Ok(Outcome::Waiting(conflict));
                }
            }
        }
    }

    fn apply(&mut self, instruction: &Instruction) -> std::result::Result<(), Conflict> {
        let txn = &instruction.txn;
        match &instruction.op {
            Operation::Read { resource } => {
                if self.locks.acquire_share(txn, resource)? == LockGrant::Granted {
                    debug!(txn = %txn, resource = %resource, "Share lock granted");
                }
                let value = self.store.read(resource);
                debug!(txn = %txn, resource = %resource, value, "Transaction read resource");
            }
            Operation::Write { resource, value } => {
                match self.locks.acquire_exclusive(txn, resource)? {
                    LockGrant::Granted => debug!(txn = %txn, resource = %resource, "Exclusive lock granted"),
                    LockGrant::Upgraded => debug!(txn = %txn, resource = %resource, "Share lock upgraded"),
                    LockGrant::AlreadyHeld => {}
                }
                let old = self.store.write(resource, *value);
                let images = self.undo.entry(txn.clone()).or_default();
                if !images.iter().any(|(key, _)| key == resource) {
                    images.push((resource.clone(), old));
                }
                debug!(txn = %txn, resource = %resource, from = old, to = *value, "Transaction wrote resource");
            }
            Operation::Commit => {
                self.locks.release_all(txn);
            }
        }
        Ok(())
    }

    fn finish_commit(&mut self, txn: &TxnId) -> Result<()> {
        self.transactions.expect_mut(txn)?.commit()?;
        self.done.clear(txn);
        self.undo.remove(txn);
        self.committed_since_drain = true;
        info!(txn = %txn, "Transaction committed");
        Ok(())
    }

    fn is_oldest(&self, txn: &TxnId, holders: &[TxnId]) -> Result<bool> {
        let ts = self.transactions.timestamp(txn)?;
        for holder in holders {
            if self.transactions.timestamp(holder)? < ts {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Abort `txn`: undo its writes, release its locks, and queue its applied
    /// and waiting instructions (in that order) for replay
    fn abort(&mut self, txn: &TxnId) -> Result<()> {
        self.transactions.expect_mut(txn)?.roll_back()?;

        for (resource, before) in self.undo.remove(txn).unwrap_or_default() {
            self.store.write(&resource, before);
            debug!(txn = %txn, resource = %resource, value = before, "Restored before-image");
        }
        self.locks.release_all(txn);

        let mut replay = self.done.take(txn);
        let (mine, rest): (VecDeque<_>, VecDeque<_>) =
            self.wait_queue.drain(..).partition(|i| &i.txn == txn);
        self.wait_queue = rest;
        replay.extend(mine);

        info!(txn = %txn, instructions = replay.len(), "Transaction is aborting");
        self.rollbacks.push(txn.clone(), replay);
        Ok(())
    }

    fn drain_rollbacks(&mut self) -> Result<()> {
        while let Some(entry) = self.rollbacks.pop()? {
            self.transactions.expect_mut(&entry.txn)?.restart(&mut self.clock)?;
            info!(txn = %entry.txn, "Trying to rollback transaction");
            for instruction in entry.instructions {
                self.process(instruction)?;
            }
        }
        Ok(())
    }

    fn drain_waits(&mut self) -> Result<()> {
        while self.committed_since_drain {
            self.committed_since_drain = false;

            let batch = std::mem::take(&mut self.wait_queue);
            for instruction in batch {
                let txn = instruction.txn.clone();
                // only the transaction's oldest queued instruction may unblock it
                let is_head = !self.wait_queue.iter().any(|i| i.txn == txn);
                if is_head && self.transactions.status(&txn)? == TransactionStatus::Waiting {
                    self.transactions.expect_mut(&txn)?.unwait()?;
                    info!(txn = %txn, "Instruction {} leaves wait-queue", instruction);
                }
                self.process(instruction)?;
                self.drain_rollbacks()?;
            }
        }
        Ok(())
    }
}

impl Default for TwoPhaseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyControl for TwoPhaseEngine {
    fn algorithm(&self) -> Algorithm {
        Algorithm::TwoPhaseLocking
    }

    fn execute(&mut self, instruction: Instruction) -> Result<Outcome> {
        if self.transactions.register(&instruction.txn, &mut self.clock)? {
            debug!(txn = %instruction.txn, "Transaction registered");
        }
        let outcome = self.process(instruction)?;
        self.drain_rollbacks()?;
        self.drain_waits()?;
        Ok(outcome)
    }

    fn has_pending_work(&self) -> bool {
        !self.rollbacks.is_empty() || (self.committed_since_drain && !self.wait_queue.is_empty())
    }

    fn resume(&mut self) -> Result<()> {
        self.drain_rollbacks()?;
        self.drain_waits()
    }

    fn report(&self) -> StatusReport {
        StatusReport {
            algorithm: self.algorithm(),
            transactions: self.transactions.iter().map(TransactionReport::from).collect(),
            data: DataSnapshot::Resources(self.store.snapshot()),
        }
    }
}
