//! Concurrency-control engines for ccsim
//!
//! This crate implements the three disciplines behind the
//! [`ConcurrencyControl`] trait:
//! - [`TwoPhaseEngine`]: two-phase locking with wound-wait
//! - [`OptimisticEngine`]: private workspaces with backward validation
//! - [`MultiversionEngine`]: multiversion timestamp ordering with cascading rollback
//!
//! Conflicts raised by the lock table, validator and version store are
//! plain [`Conflict`] values resolved inside each engine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod journal;
pub mod lock;
pub mod mvto;
pub mod occ;
pub mod snapshot;
pub mod two_phase;
pub mod validation;
pub mod version;

pub use engine::{ConcurrencyControl, Conflict, EngineConfig, Outcome};
pub use journal::{DoneLog, RollbackEntry, RollbackQueue};
pub use lock::{LockGrant, LockMode, LockTable};
pub use mvto::MultiversionEngine;
pub use occ::OptimisticEngine;
pub use snapshot::{FinishedWindow, SnapshotStore, Workspace};
pub use two_phase::TwoPhaseEngine;
pub use validation::validate;
pub use version::{DependencyGraph, ResourceVersion, VersionStore, WriteEffect};
