//! Trace parsing and the instruction feed
//!
//! A trace is a text file with one instruction per line:
//!
//! ```text
//! # comment
//! R T1 X        read X in T1
//! W T2 X=-5     write -5 to X in T2
//! C T1          commit T1
//! ```
//!
//! Operation letters are case-insensitive. Blank lines and lines starting
//! with `#` are skipped. Anything else that does not match one of the three
//! shapes stops the run with [`Error::InvalidInstructionLine`]. Running out
//! of lines is not an error: [`InstructionFeed::next_instruction`] returns
//! `Ok(None)`.

use crate::error::{Error, LineError, Result};
use crate::instruction::Instruction;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

/// Sequential source of instructions
pub trait InstructionFeed {
    /// Next instruction, or `None` once the input is exhausted
    fn next_instruction(&mut self) -> Result<Option<Instruction>>;

    /// Stop reading; further calls to `next_instruction` return `None`
    fn close(&mut self);

    /// Check if the feed has been closed
    fn is_closed(&self) -> bool;
}

/// Parse one non-comment trace line
///
/// `line_no` is only used to label the error.
pub fn parse_line(line: &str, line_no: usize) -> Result<Instruction> {
    parse_tokens(line).map_err(|reason| Error::InvalidInstructionLine {
        line: line_no,
        reason,
    })
}

fn parse_tokens(line: &str) -> std::result::Result<Instruction, LineError> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let (op, txn) = match parts.as_slice() {
        [] => return Err(LineError::Empty),
        [_] => return Err(LineError::MissingTransactionId),
        [op, txn, ..] => (op.to_ascii_uppercase(), *txn),
    };

    match op.as_str() {
        "R" => {
            let resource = match parts.as_slice() {
                [_, _] => return Err(LineError::MissingResource),
                [_, _, resource] => *resource,
                _ => return Err(LineError::TooManyArguments),
            };
            if resource.contains('=') {
                return Err(LineError::ForbiddenEquals);
            }
            Ok(Instruction::read(txn, resource))
        }
        "W" => {
            let token = match parts.as_slice() {
                [_, _] => return Err(LineError::MissingResource),
                [_, _, token] => *token,
                _ => return Err(LineError::TooManyArguments),
            };
            let mut pieces = token.split('=');
            let (resource, raw) = match (pieces.next(), pieces.next(), pieces.next()) {
                (Some(resource), Some(raw), None) => (resource, raw),
                (_, None, _) => return Err(LineError::MissingValue),
                _ => return Err(LineError::TooManyEquals),
            };
            if resource.is_empty() {
                return Err(LineError::EmptyResource);
            }
            let value = raw
                .parse::<i64>()
                .map_err(|_| LineError::InvalidValue(raw.to_string()))?;
            Ok(Instruction::write(txn, resource, value))
        }
        "C" => {
            if parts.len() > 2 {
                return Err(LineError::TooManyArguments);
            }
            Ok(Instruction::commit(txn))
        }
        _ => Err(LineError::UnknownOperation(parts[0].to_string())),
    }
}

/// Line-oriented trace reader
pub struct TraceReader<R> {
    source: R,
    line_no: usize,
    closed: bool,
    buf: String,
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(TraceReader::new(BufReader::new(file)))
    }
}

impl TraceReader<Cursor<Vec<u8>>> {
    /// Read a trace held in memory
    pub fn from_text(text: &str) -> Self {
        TraceReader::new(Cursor::new(text.as_bytes().to_vec()))
    }
}

impl<R: BufRead> TraceReader<R> {
    /// Wrap any buffered reader
    pub fn new(source: R) -> Self {
        TraceReader {
            source,
            line_no: 0,
            closed: false,
            buf: String::new(),
        }
    }

    /// Number of lines consumed so far
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> InstructionFeed for TraceReader<R> {
    fn next_instruction(&mut self) -> Result<Option<Instruction>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            if self.source.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return parse_line(line, self.line_no).map(Some);
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Feed backed by an already-parsed list of instructions
#[derive(Debug, Clone, Default)]
pub struct VecFeed {
    items: std::collections::VecDeque<Instruction>,
    closed: bool,
}

impl VecFeed {
    /// Feed that yields `items` in order
    pub fn new(items: impl IntoIterator<Item = Instruction>) -> Self {
        VecFeed {
            items: items.into_iter().collect(),
            closed: false,
        }
    }
}

impl InstructionFeed for VecFeed {
    fn next_instruction(&mut self) -> Result<Option<Instruction>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.items.pop_front())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
