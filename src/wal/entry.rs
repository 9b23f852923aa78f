//! Log entry definitions
//!
//! Defines the structure and line framing of individual log entries.

use std::fmt;

use crate::error::{HeapWalError, Result};

/// Kind of statement; doubles as the op code written to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpType {
    Insert = 1,
    Update = 2,
    Remove = 3,
    /// Never logged
    Select = 4,
}

impl OpType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(OpType::Insert),
            2 => Some(OpType::Update),
            3 => Some(OpType::Remove),
            4 => Some(OpType::Select),
            _ => None,
        }
    }

    /// Whether statements of this kind change state (and get logged)
    pub fn is_mutation(self) -> bool {
        !matches!(self, OpType::Select)
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpType::Insert => "insert",
            OpType::Update => "update",
            OpType::Remove => "remove",
            OpType::Select => "select",
        };
        f.write_str(name)
    }
}

/// A single entry in the log
///
/// Framed as one line: `<transaction_id> <op_code> <table_id> <payload>\n`.
/// The payload is a tuple string and may itself contain spaces, so parsing
/// splits off the first three tokens and keeps the rest verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub transaction_id: u64,
    pub op_type: OpType,
    pub table_id: u32,
    /// Insert: the new tuple. Remove: the before-image. Update: the after-image.
    pub payload: String,
}

impl LogEntry {
    pub fn new(transaction_id: u64, op_type: OpType, table_id: u32, payload: impl Into<String>) -> Self {
        Self {
            transaction_id,
            op_type,
            table_id,
            payload: payload.into(),
        }
    }

    /// Render the entry as a complete log line, newline included
    pub fn encode(&self) -> Result<String> {
        if !self.op_type.is_mutation() {
            return Err(HeapWalError::LogWrite(format!(
                "{} statements are not logged",
                self.op_type
            )));
        }
        if self.payload.contains(['\n', '\r']) {
            return Err(HeapWalError::LogWrite(
                "Payload contains a line break".to_string(),
            ));
        }
        Ok(format!(
            "{} {} {} {}\n",
            self.transaction_id,
            self.op_type.code(),
            self.table_id,
            self.payload
        ))
    }

    /// Parse one log line (without its trailing newline)
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.splitn(4, ' ');

        let transaction_id = parse_token::<u64>(parts.next(), "transaction id", line)?;
        let code = parse_token::<u8>(parts.next(), "op code", line)?;
        let table_id = parse_token::<u32>(parts.next(), "table id", line)?;
        let payload = parts
            .next()
            .ok_or_else(|| HeapWalError::LogCorruption(format!("Missing payload in {:?}", line)))?;

        let op_type = OpType::from_code(code)
            .filter(|op| op.is_mutation())
            .ok_or_else(|| HeapWalError::LogCorruption(format!("Invalid op code {} in {:?}", code, line)))?;

        Ok(Self {
            transaction_id,
            op_type,
            table_id,
            payload: payload.to_string(),
        })
    }
}

fn parse_token<T: std::str::FromStr>(token: Option<&str>, what: &str, line: &str) -> Result<T> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| HeapWalError::LogCorruption(format!("Invalid {} in {:?}", what, line)))
}
