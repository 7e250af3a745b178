//! Simulation harness for ccsim
//!
//! Wires an instruction feed to the engine selected in
//! [`SimulationOptions`] and runs the driver loop to completion:
//! - [`Simulation`]: entry points over files, text and feeds
//! - [`Driver`]: the feed/resume loop
//! - [`SimulationOptions`]: run configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod options;
pub mod simulation;

pub use driver::{Driver, DriverStats};
pub use options::SimulationOptions;
pub use simulation::{build_engine, resolve_trace_path, Simulation};
