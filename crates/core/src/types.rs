//! Core types for the simulator
//!
//! This module defines the fundamental types used throughout the system:
//! - [`TxnId`]: Identifier of a transaction as written in the trace
//! - [`Timestamp`]: Logical point in the simulated schedule
//! - [`LogicalClock`]: Source of strictly increasing timestamps
//! - [`Algorithm`]: The concurrency-control discipline being simulated

use serde::{Deserialize, Serialize};

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Key of a resource cell (e.g. `X` in `W T1 X=5`)
pub type ResourceKey = String;

/// Identifier of a transaction
///
/// Transaction ids are opaque strings taken verbatim from the trace
/// (`T1`, `reader`, ...). A transaction is created the first time an
/// instruction references its id.
///
/// # Examples
///
/// ```
/// use ccsim_core::TxnId;
///
/// let id = TxnId::new("T1");
/// assert_eq!(id.as_str(), "T1");
/// assert_eq!(id.to_string(), "T1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnId(String);

impl TxnId {
    /// Create a transaction id
    pub fn new(id: impl Into<String>) -> Self {
        TxnId(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxnId {
    fn from(id: &str) -> Self {
        TxnId::new(id)
    }
}

impl From<String> for TxnId {
    fn from(id: String) -> Self {
        TxnId(id)
    }
}

/// Logical timestamp
///
/// Timestamps are totally ordered and never tie between two draws from the
/// same [`LogicalClock`]. [`Timestamp::ZERO`] is never drawn: it is reserved
/// for the initial version every resource owns under multiversion timestamp
/// ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Timestamp of the initial version of every resource
    pub const ZERO: Timestamp = Timestamp(0);

    /// Wrap a raw tick value
    pub const fn new(raw: u64) -> Self {
        Timestamp(raw)
    }

    /// Raw tick value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strictly increasing source of timestamps
///
/// Every call to [`LogicalClock::tick`] returns a timestamp greater than all
/// previously returned ones, which gives the "no two transactions share a
/// timestamp" guarantee without depending on wall-clock granularity.
#[derive(Debug, Clone)]
pub struct LogicalClock {
    next: u64,
}

impl LogicalClock {
    /// Create a clock whose first tick is `1`
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create a clock whose first tick is `start` (clamped to at least `1`)
    pub fn starting_at(start: u64) -> Self {
        LogicalClock {
            next: start.max(1),
        }
    }

    /// Draw the next timestamp
    ///
    /// Fails once the clock is exhausted instead of wrapping onto
    /// [`Timestamp::ZERO`].
    pub fn tick(&mut self) -> crate::Result<Timestamp> {
        let ts = Timestamp(self.next);
        self.next = self
            .next
            .checked_add(1)
            .ok_or_else(|| Error::Internal("logical clock exhausted".to_string()))?;
        Ok(ts)
    }

    /// Timestamp the next call to [`tick`](Self::tick) will return
    pub fn peek(&self) -> Timestamp {
        Timestamp(self.next)
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Concurrency-control discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Two-phase locking with wound-wait deadlock avoidance
    TwoPhaseLocking,
    /// Optimistic concurrency control with backward validation
    Optimistic,
    /// Multiversion timestamp ordering
    Multiversion,
}

impl Algorithm {
    /// All algorithms, in menu order
    pub const ALL: [Algorithm; 3] = [
        Algorithm::TwoPhaseLocking,
        Algorithm::Optimistic,
        Algorithm::Multiversion,
    ];

    /// Short machine-friendly name
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::TwoPhaseLocking => "2pl",
            Algorithm::Optimistic => "occ",
            Algorithm::Multiversion => "mvto",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Algorithm::TwoPhaseLocking => "Two Phase Locking",
            Algorithm::Optimistic => "Optimistic Concurrency Control",
            Algorithm::Multiversion => "Multiversion Timestamp Ordering Concurrency Control",
        };
        f.write_str(label)
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "2pl" | "two-phase" | "two-phase-locking" => Ok(Algorithm::TwoPhaseLocking),
            "2" | "occ" | "optimistic" => Ok(Algorithm::Optimistic),
            "3" | "mvcc" | "mvto" | "multiversion" => Ok(Algorithm::Multiversion),
            other => Err(format!(
                "unknown algorithm '{}' (expected 2pl, occ or mvto)",
                other
            )),
        }
    }
}
