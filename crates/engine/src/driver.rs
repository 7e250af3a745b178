//! The driver loop
//!
//! Pulls instructions from the feed while it is open and hands each one to
//! the engine. Once the feed is exhausted it is closed and the engine is
//! resumed until it reports no queued work that could still progress.

use ccsim_concurrency::{ConcurrencyControl, Outcome};
use ccsim_core::{InstructionFeed, Result, StatusReport};
use tracing::{debug, info, trace};

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Instructions read from the feed
    pub fed: u64,
    /// Fed instructions that applied immediately
    pub applied: u64,
    /// Fed instructions that were parked in a wait-queue
    pub waited: u64,
    /// Fed instructions whose transaction was aborted
    pub aborted: u64,
    /// Fed instructions dropped because their transaction had committed
    pub ignored: u64,
    /// Resume calls after the feed closed
    pub resumes: u64,
}

impl DriverStats {
    fn count(&mut self, outcome: &Outcome) {
        self.fed += 1;
        match outcome {
            Outcome::Applied => self.applied += 1,
            Outcome::Waiting(_) => self.waited += 1,
            Outcome::Aborted(_) => self.aborted += 1,
            Outcome::Ignored => self.ignored += 1,
            Outcome::Deferred => {}
        }
    }
}

/// Drives one engine over one feed
pub struct Driver<'a> {
    engine: &'a mut dyn ConcurrencyControl,
    stats: DriverStats,
}

impl<'a> Driver<'a> {
    /// Wrap an engine
    pub fn new(engine: &'a mut dyn ConcurrencyControl) -> Self {
        Driver {
            engine,
            stats: DriverStats::default(),
        }
    }

    /// Run `feed` to exhaustion, then settle the engine's queues and report
    pub fn run(&mut self, feed: &mut dyn InstructionFeed) -> Result<StatusReport> {
        while let Some(instruction) = feed.next_instruction()? {
            trace!("Executing {}", instruction);
            let outcome = self.engine.execute(instruction)?;
            if let Some(conflict) = outcome.conflict() {
                debug!(reason = %conflict, "Instruction did not apply");
            }
            self.stats.count(&outcome);
        }
        feed.close();
        debug!(fed = self.stats.fed, "Instruction feed exhausted");

        while self.engine.has_pending_work() {
            self.engine.resume()?;
            self.stats.resumes += 1;
        }

        let report = self.engine.report();
        info!(
            algorithm = %report.algorithm,
            transactions = report.transactions.len(),
            finished = report.transactions.iter().filter(|t| t.finished()).count(),
            "Simulation finished"
        );
        Ok(report)
    }

    /// Counters so far
    pub fn stats(&self) -> DriverStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccsim_concurrency::TwoPhaseEngine;
    use ccsim_core::{Instruction, TraceReader, VecFeed};

    #[test]
    fn test_run_closes_feed_and_reports() {
        let mut engine = TwoPhaseEngine::new();
        let mut feed = VecFeed::new(vec![
            Instruction::write("T1", "X", 1),
            Instruction::write("T2", "X", 2),
            Instruction::commit("T1"),
            Instruction::commit("T2"),
        ]);
        let mut driver = Driver::new(&mut engine);
        let report = driver.run(&mut feed).unwrap();

        assert!(feed.is_closed());
        assert!(report.all_finished());
        assert_eq!(report.value_of("X"), Some(2));

        let stats = driver.stats();
        assert_eq!(stats.fed, 4);
        assert_eq!(stats.waited, 1);
    }

    #[test]
    fn test_parse_error_stops_run() {
        let mut engine = TwoPhaseEngine::new();
        let mut feed = TraceReader::from_text("R T1 X\nZ T1 X\n");
        let err = Driver::new(&mut engine).run(&mut feed).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_empty_feed_reports_nothing() {
        let mut engine = TwoPhaseEngine::new();
        let mut feed = VecFeed::new(Vec::new());
        let report = Driver::new(&mut engine).run(&mut feed).unwrap();
        assert!(report.transactions.is_empty());
    }
}
