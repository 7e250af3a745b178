//! Error types for the simulator
//!
//! Only fatal conditions live here. Concurrency conflicts (lock conflicts,
//! failed validation, forbidden timestamp writes) are ordinary control flow
//! and are modelled as values by the engines, never as [`Error`]s.

use std::fmt;
use thiserror::Error;

/// Reason a trace line could not be turned into an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// The line holds no tokens
    Empty,
    /// Only the operation token is present
    MissingTransactionId,
    /// The operation token is not `R`, `W` or `C`
    UnknownOperation(String),
    /// A read or write without a resource token
    MissingResource,
    /// More tokens than the operation accepts
    TooManyArguments,
    /// A read resource containing `=`
    ForbiddenEquals,
    /// A write token without `=`
    MissingValue,
    /// A write token with more than one `=`
    TooManyEquals,
    /// A write token with an empty resource name
    EmptyResource,
    /// A write value that is not a signed integer
    InvalidValue(String),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Empty => write!(f, "empty line"),
            LineError::MissingTransactionId => write!(f, "missing transaction id"),
            LineError::UnknownOperation(op) => write!(f, "invalid instruction type '{}'", op),
            LineError::MissingResource => write!(f, "missing resource id"),
            LineError::TooManyArguments => write!(f, "too many arguments"),
            LineError::ForbiddenEquals => {
                write!(f, "forbidden character in resource id for read instruction: '='")
            }
            LineError::MissingValue => write!(f, "missing update value on write instruction"),
            LineError::TooManyEquals => write!(f, "too many '=' characters in write instruction"),
            LineError::EmptyResource => write!(f, "empty resource id in write instruction"),
            LineError::InvalidValue(raw) => write!(f, "update value '{}' is not an integer", raw),
        }
    }
}

/// All fatal simulator errors
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed trace line; fatal to the run
    #[error("invalid instruction at line {line}: {reason}")]
    InvalidInstructionLine {
        /// 1-based line number in the trace
        line: usize,
        /// What was wrong with it
        reason: LineError,
    },

    /// I/O error while reading the trace
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal consistency failure (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an [`Error::Internal`] from anything displayable
    pub fn internal(msg: impl fmt::Display) -> Self {
        Error::Internal(msg.to_string())
    }

    /// Check if this error comes from the trace rather than the simulator
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidInstructionLine { .. } | Error::Io(_))
    }

    /// Check if this is an invariant violation
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}
