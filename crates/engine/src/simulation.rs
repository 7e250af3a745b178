//! Simulation entry points
//!
//! A [`Simulation`] builds the engine chosen in its options and runs it
//! over a trace file, in-memory text, or any [`InstructionFeed`].

use std::path::{Path, PathBuf};

use ccsim_concurrency::{
    ConcurrencyControl, MultiversionEngine, OptimisticEngine, TwoPhaseEngine,
};
use ccsim_core::{Algorithm, Error, InstructionFeed, Result, StatusReport, TraceReader};
use tracing::info;

use crate::driver::Driver;
use crate::options::SimulationOptions;

/// Build the engine for `options`
pub fn build_engine(options: &SimulationOptions) -> Box<dyn ConcurrencyControl> {
    let config = options.engine_config();
    match options.algorithm {
        Algorithm::TwoPhaseLocking => Box::new(TwoPhaseEngine::with_config(config)),
        Algorithm::Optimistic => Box::new(OptimisticEngine::with_config(config)),
        Algorithm::Multiversion => Box::new(MultiversionEngine::with_config(config)),
    }
}

/// Resolve a trace path; a path without an extension that does not exist
/// also tries `<path>.txt`
pub fn resolve_trace_path(path: &Path) -> PathBuf {
    if path.exists() || path.extension().is_some() {
        return path.to_path_buf();
    }
    let with_txt = path.with_extension("txt");
    if with_txt.exists() {
        with_txt
    } else {
        path.to_path_buf()
    }
}

/// A configured simulation
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    options: SimulationOptions,
}

impl Simulation {
    /// Create a simulation with `options`
    pub fn new(options: SimulationOptions) -> Self {
        Simulation { options }
    }

    /// Shorthand for default options with `algorithm`
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        Self::new(SimulationOptions::new().algorithm(algorithm))
    }

    /// Options in effect
    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    /// Run over a trace file
    pub fn run_path(&self, path: impl AsRef<Path>) -> Result<StatusReport> {
        let path = resolve_trace_path(path.as_ref());
        let mut feed = TraceReader::open(&path).map_err(|e| match e {
            Error::Io(io) => Error::Io(std::io::Error::new(
                io.kind(),
                format!("{}: {}", path.display(), io),
            )),
            other => other,
        })?;
        info!(path = %path.display(), algorithm = %self.options.algorithm, "Running trace file");
        self.run_feed(&mut feed)
    }

    /// Run over trace text held in memory
    pub fn run_text(&self, text: &str) -> Result<StatusReport> {
        self.run_feed(&mut TraceReader::from_text(text))
    }

    /// Run over any feed
    pub fn run_feed(&self, feed: &mut dyn InstructionFeed) -> Result<StatusReport> {
        let mut engine = build_engine(&self.options);
        Driver::new(engine.as_mut()).run(feed)
    }
}
