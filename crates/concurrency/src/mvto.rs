//! Multiversion timestamp ordering with cascading rollback
//!
//! Reads never block: each one sees the latest version at or below the
//! reader's timestamp. A write is refused only when a later timestamp has
//! already read the version it would supersede. The writer is then rolled
//! back together with every transaction that transitively read one of its
//! uncommitted versions. Rolled-back transactions restart with fresh, later
//! timestamps and replay their instructions.

use ccsim_core::{
    Algorithm, DataSnapshot, Error, Instruction, LogicalClock, Operation, Result, StatusReport,
    TimestampDiscipline, TransactionReport, TransactionStatus, TransactionTable,
};
use tracing::{debug, info, warn};

use crate::engine::{ConcurrencyControl, Conflict, EngineConfig, Outcome};
use crate::journal::{DoneLog, RollbackQueue};
use crate::version::{VersionStore, WriteEffect};

/// Multiversion engine
pub struct MultiversionEngine {
    clock: LogicalClock,
    transactions: TransactionTable,
    versions: VersionStore,
    done: DoneLog,
    rollbacks: RollbackQueue,
}

impl MultiversionEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub fn with_config(config: EngineConfig) -> Self {
        MultiversionEngine {
            clock: LogicalClock::starting_at(config.clock_start),
            transactions: TransactionTable::new(TimestampDiscipline::Dynamic),
            versions: VersionStore::new(),
            done: DoneLog::new(),
            rollbacks: RollbackQueue::new(config.max_replays),
        }
    }

    /// Registered transactions
    pub fn transactions(&self) -> &TransactionTable {
        &self.transactions
    }

    /// Version chains
    pub fn versions(&self) -> &VersionStore {
        &self.versions
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
                "multiversion transaction {} cannot wait",
                instruction.txn
            ))),
            TransactionStatus::Committed => {
                warn!(txn = %instruction.txn, "Dropping {}: transaction already committed", instruction);
                Ok(Outcome::Ignored)
            }
        }
    }

    fn apply(&mut self, instruction: Instruction) -> Result<Outcome> {
        let txn = instruction.txn.clone();
        let ts = self.transactions.timestamp(&txn)?;
        match &instruction.op {
            Operation::Read { resource } => {
                let value = self.versions.read(&txn, ts, resource)?;
                debug!(txn = %txn, resource = %resource, ts = %ts, value, "Transaction read version");
            }
            Operation::Write { resource, value } => {
                match self.versions.write(&txn, ts, resource, *value)? {
                    Ok(WriteEffect::Created) => {
                        debug!(txn = %txn, resource = %resource, ts = %ts, value = *value, "Created version")
                    }
                    Ok(WriteEffect::Overwritten) => {
                        debug!(txn = %txn, resource = %resource, ts = %ts, value = *value, "Overwrote own version")
                    }
                    Err(conflict) => {
                        self.cascade(instruction.clone(), &conflict)?;
                        return Ok(Outcome::Aborted(conflict));
                    }
                }
            }
            Operation::Commit => {
                self.versions.commit(&txn);
                self.transactions.expect_mut(&txn)?.commit()?;
                self.done.clear(&txn);
                info!(txn = %txn, ts = %ts, "Transaction committed");
                return Ok(Outcome::Applied);
            }
        }
        self.done.record(instruction);
        Ok(Outcome::Applied)
    }

    /// Roll back the writer of `failed` and every transaction that read its
    /// uncommitted versions, directly or transitively
    fn cascade(&mut self, failed: Instruction, conflict: &Conflict) -> Result<()> {
        let victims = self.versions.cascade_set(&failed.txn);
        info!(txn = %failed.txn, reason = %conflict, victims = ?victims, "Cascading rollback");

        let mut failed = Some(failed);
        for victim in victims {
            let removed = self.versions.rollback(&victim);
            self.transactions.expect_mut(&victim)?.roll_back()?;

            let mut replay = self.done.take(&victim);
            if failed.as_ref().is_some_and(|i| i.txn == victim) {
                replay.extend(failed.take());
            }
            info!(txn = %victim, versions = removed, instructions = replay.len(), "Transaction is aborting");
            self.rollbacks.push(victim, replay);
        }
        Ok(())
    }

    fn drain_rollbacks(&mut self) -> Result<()> {
        while let Some(entry) = self.rollbacks.pop()? {
            self.transactions.expect_mut(&entry.txn)?.restart(&mut self.clock)?;
            info!(
                txn = %entry.txn,
                ts = %self.transactions.timestamp(&entry.txn)?,
                "Trying to rollback transaction"
            );
            for instruction in entry.instructions {
                self.process(instruction)?;
            }
        }
        Ok(())
    }
}

impl Default for MultiversionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyControl for MultiversionEngine {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Multiversion
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
            data: DataSnapshot::Versions(self.versions.snapshot()),
        }
    }
}
