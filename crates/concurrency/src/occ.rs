//! Optimistic concurrency control with backward validation
//!
//! Transactions run against private workspaces and never block. At commit
//! the transaction is stamped with a validation timestamp and checked
//! against every transaction that finished since it started. A valid
//! transaction flushes its writes to the shared store and is stamped with a
//! finish timestamp. An invalid one loses its workspace and is replayed as a
//! new attempt with a fresh start timestamp.

use ccsim_core::{
    Algorithm, DataSnapshot, Error, Instruction, LogicalClock, Operation, ResourceStore, Result,
    StatusReport, Timestamp, TimestampDiscipline, TransactionReport, TransactionStatus,
    TransactionTable, TxnId,
};
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::engine::{ConcurrencyControl, Conflict, EngineConfig, Outcome};
use crate::journal::{DoneLog, RollbackQueue};
use crate::snapshot::{FinishedWindow, SnapshotStore};
use crate::validation::validate;

/// Optimistic engine
pub struct OptimisticEngine {
    clock: LogicalClock,
    transactions: TransactionTable,
    store: ResourceStore,
    snapshots: SnapshotStore,
    done: DoneLog,
    rollbacks: RollbackQueue,
}

impl OptimisticEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub fn with_config(config: EngineConfig) -> Self {
        OptimisticEngine {
            clock: LogicalClock::starting_at(config.clock_start),
            transactions: TransactionTable::new(TimestampDiscipline::Dynamic),
            store: ResourceStore::new(),
            snapshots: SnapshotStore::new(),
            done: DoneLog::new(),
            rollbacks: RollbackQueue::new(config.max_replays),
        }
    }

    /// Registered transactions
    pub fn transactions(&self) -> &TransactionTable {
        &self.transactions
    }

    /// Shared resource store (committed values only)
    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Private workspaces and finished windows
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    fn process(&mut self, instruction: Instruction) -> Result<Outcome> {
        match self.transactions.status(&instruction.txn)? {
            TransactionStatus::Active => self.apply(instruction),
            TransactionStatus::Aborting => {
                if !self.rollbacks.append_to(instruction.clone()) {
                    return Err(Error::Internal(format!(
                        "transaction {} is aborting but has no rollback entry",
                        instruction.txn
                    )));
                }
                Ok(Outcome::Deferred)
            }
            TransactionStatus::Waiting => Err(Error::Internal(format!(
                "optimistic transaction {} cannot wait",
                instruction.txn
            ))),
            TransactionStatus::Committed => {
                warn!(txn = %instruction.txn, "Dropping {}: transaction already committed", instruction);
                Ok(Outcome::Ignored)
            }
        }
    }

    fn apply(&mut self, instruction: Instruction) -> Result<Outcome> {
        if instruction.is_commit() {
            return self.commit(instruction);
        }
        let txn = &instruction.txn;
        match &instruction.op {
            Operation::Read { resource } => {
                let value = self.snapshots.read(txn, resource, &mut self.store);
                debug!(txn = %txn, resource = %resource, value, "Transaction read resource");
            }
            Operation::Write { resource, value } => {
                self.snapshots.write(txn, resource, *value);
                debug!(txn = %txn, resource = %resource, value = *value, "Transaction wrote to workspace");
            }
            Operation::Commit => {}
        }
        self.done.record(instruction);
        Ok(Outcome::Applied)
    }

    fn commit(&mut self, instruction: Instruction) -> Result<Outcome> {
        let txn = instruction.txn.clone();
        let validated_at = self.clock.tick()?;
        let start = {
            let t = self.transactions.expect_mut(&txn)?;
            t.stamp_validation(validated_at);
            t.timestamp()
        };
        debug!(txn = %txn, ts = %validated_at, "Validating transaction");

        let verdict = validate(
            &txn,
            start,
            self.snapshots.workspace(&txn),
            self.snapshots.finished(),
        );
        match verdict {
            Ok(()) => {
                self.write_phase(&txn, start)?;
                Ok(Outcome::Applied)
            }
            Err(conflict) => {
                self.abort(instruction, &conflict)?;
                Ok(Outcome::Aborted(conflict))
            }
        }
    }

    fn write_phase(&mut self, txn: &TxnId, start: Timestamp) -> Result<()> {
        let workspace = self.snapshots.discard(txn).unwrap_or_default();
        let mut write_set = FxHashSet::default();
        for resource in workspace.write_history() {
            if !write_set.insert(resource.clone()) {
                continue;
            }
            let value = workspace.value(resource).ok_or_else(|| {
                Error::Internal(format!("{} wrote {} but its workspace has no value", txn, resource))
            })?;
            let old = self.store.write(resource, value);
            debug!(txn = %txn, resource = %resource, from = old, to = value, "Flushed write to store");
        }

        let finish = self.clock.tick()?;
        let t = self.transactions.expect_mut(txn)?;
        t.stamp_finish(finish);
        t.commit()?;
        self.done.clear(txn);
        self.snapshots.record_finished(FinishedWindow {
            txn: txn.clone(),
            start,
            finish,
            write_set,
        });
        info!(txn = %txn, ts = %finish, "Transaction committed");

        let oldest_start = self
            .transactions
            .iter()
            .filter(|t| t.is_active())
            .map(|t| t.timestamp())
            .min();
        self.snapshots.prune(oldest_start);
        Ok(())
    }

    fn abort(&mut self, failed: Instruction, conflict: &Conflict) -> Result<()> {
        let txn = failed.txn.clone();
        self.snapshots.discard(&txn);
        self.transactions.expect_mut(&txn)?.roll_back()?;

        let mut replay = self.done.take(&txn);
        replay.push(failed);
        info!(txn = %txn, reason = %conflict, instructions = replay.len(), "Transaction failed validation");
        self.rollbacks.push(txn, replay);
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
}

impl Default for OptimisticEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyControl for OptimisticEngine {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Optimistic
    }

    fn execute(&mut self, instruction: Instruction) -> Result<Outcome> {
        if self.transactions.register(&instruction.txn, &mut self.clock)? {
            debug!(txn = %instruction.txn, "Transaction started");
        }
        let outcome = self.process(instruction)?;
        self.drain_rollbacks()?;
        Ok(outcome)
    }

    fn has_pending_work(&self) -> bool {
        !self.rollbacks.is_empty()
    }

    fn resume(&mut self) -> Result<()> {
        self.drain_rollbacks()
    }

    fn report(&self) -> StatusReport {
        StatusReport {
            algorithm: self.algorithm(),
            transactions: self.transactions.iter().map(TransactionReport::from).collect(),
            data: DataSnapshot::Resources(self.store.snapshot()),
        }
    }
}
