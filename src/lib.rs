//! # ccsim
//!
//! Deterministic simulator for transaction concurrency-control algorithms.
//!
//! A trace of reads, writes and commits tagged by transaction is replayed
//! under one of three disciplines:
//!
//! - two-phase locking with wound-wait deadlock avoidance
//! - optimistic concurrency control with backward validation
//! - multiversion timestamp ordering with cascading rollback
//!
//! ## Quick Start
//!
//! ```ignore
//! use ccsim::prelude::*;
//!
//! let report = Simulation::with_algorithm(Algorithm::Optimistic)
//!     .run_text("W T1 X=1\nW T2 X=2\nC T1\nC T2\n")?;
//! assert_eq!(report.value_of("X"), Some(2));
//! println!("{}", report);
//! ```
//!
//! ## Crates
//!
//! - [`ccsim_core`]: instructions, transactions, trace parsing, reports, errors
//! - [`ccsim_concurrency`]: the [`ConcurrencyControl`] engines and their data structures
//! - [`ccsim_engine`]: [`Simulation`], the [`Driver`] loop and [`SimulationOptions`]

#![warn(missing_docs)]

pub mod prelude;

pub use ccsim_concurrency;
pub use ccsim_core;
pub use ccsim_engine;

pub use ccsim_concurrency::{
    ConcurrencyControl, Conflict, MultiversionEngine, OptimisticEngine, Outcome, TwoPhaseEngine,
};
pub use ccsim_core::{
    Algorithm, DataSnapshot, Error, Instruction, InstructionFeed, Operation, Result,
    StatusReport, Timestamp, TraceReader, TransactionReport, TransactionStatus, TxnId, VecFeed,
};
pub use ccsim_engine::{Driver, Simulation, SimulationOptions};
