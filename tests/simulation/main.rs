//! Simulation Integration Tests
//!
//! Drives the public `Simulation` API over in-memory and file-backed traces
//! for each concurrency-control algorithm.

mod common;

mod driver;
mod mvto;
mod occ;
mod two_phase;

pub use ccsim::prelude::*;
pub use ccsim::DataSnapshot;
pub use common::*;
