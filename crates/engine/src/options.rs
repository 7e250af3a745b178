//! Run configuration
//!
//! Use the builder pattern to configure a simulation:
//!
//! ```ignore
//! use ccsim_engine::SimulationOptions;
//! use ccsim_core::Algorithm;
//!
//! let opts = SimulationOptions::new()
//!     .algorithm(Algorithm::Multiversion)
//!     .max_replays(Some(1_000));
//! ```

use ccsim_concurrency::EngineConfig;
use ccsim_core::Algorithm;
use serde::{Deserialize, Serialize};

/// Options for a simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Concurrency-control discipline
    pub algorithm: Algorithm,
    /// Rollback replays allowed before the run is declared runaway; unbounded by default
    pub max_replays: Option<u64>,
    /// First logical timestamp handed out
    pub clock_start: u64,
}

impl SimulationOptions {
    /// Default options (two-phase locking)
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the discipline
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Bound rollback replays; `None` removes the bound
    pub fn max_replays(mut self, max: Option<u64>) -> Self {
        self.max_replays = max;
        self
    }

    /// First logical timestamp; 0 is reserved and raised to 1
    pub fn clock_start(mut self, start: u64) -> Self {
        self.clock_start = start.max(1);
        self
    }

    /// Engine tunables derived from these options
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            clock_start: self.clock_start.max(1),
            max_replays: self.max_replays,
        }
    }
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::TwoPhaseLocking,
            max_replays: None,
            clock_start: 1,
        }
    }
}
