//! Convenient imports for ccsim.
//!
//! ```ignore
//! use ccsim::prelude::*;
//!
//! let report = Simulation::with_algorithm(Algorithm::Multiversion).run_path("trace.txt")?;
//! ```

// Entry points
pub use ccsim_engine::{Simulation, SimulationOptions};

// Error handling
pub use ccsim_core::{Error, Result};

// Trace and report types
pub use ccsim_core::{Algorithm, Instruction, StatusReport, TransactionStatus, TxnId};
