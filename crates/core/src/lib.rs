//! Core types for ccsim
//!
//! This crate defines everything the concurrency-control engines share:
//! - Identifiers and the logical clock ([`TxnId`], [`Timestamp`], [`LogicalClock`])
//! - The instruction model ([`Instruction`], [`Operation`])
//! - The transaction status machine ([`Transaction`], [`TransactionTable`])
//! - The plain resource store ([`ResourceStore`])
//! - Trace parsing and the instruction feed ([`TraceReader`], [`InstructionFeed`])
//! - The final [`StatusReport`]
//! - The fatal error taxonomy ([`Error`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod instruction;
pub mod report;
pub mod resource;
pub mod trace;
pub mod transaction;
pub mod types;

pub use error::{Error, LineError, Result};
pub use instruction::{Instruction, Operation};
pub use report::{DataSnapshot, ResourceVersions, StatusReport, TransactionReport, VersionReport};
pub use resource::ResourceStore;
pub use trace::{parse_line, InstructionFeed, TraceReader, VecFeed};
pub use transaction::{TimestampDiscipline, Transaction, TransactionStatus, TransactionTable};
pub use types::{Algorithm, LogicalClock, ResourceKey, Timestamp, TxnId};
