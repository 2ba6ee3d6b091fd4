//! Value: TLA+ value syntax for rendered snapshots.
//!
//! Conversion from the state model lives here rather than on the model
//! types, so the data stays independent of the checker's syntax.

use std::fmt;

use crate::state::{OpLogEntry, ServerState};

/// A TLA+ constant expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlaValue {
    Int(i128),
    Str(String),
    Bool(bool),
    /// `<<a, b>>`
    Seq(Vec<TlaValue>),
    /// `{a, b}`
    Set(Vec<TlaValue>),
    /// `[field |-> value, ...]`
    Record(Vec<(String, TlaValue)>),
    /// Function over `0..(n-1)`, one value per server index
    Function(Vec<TlaValue>),
}

impl TlaValue {
    pub fn str(s: impl Into<String>) -> Self {
        TlaValue::Str(s.into())
    }

    /// `0..(n-1)` as an explicit set.
    pub fn index_set(n: usize) -> Self {
        TlaValue::Set((0..n).map(|i| TlaValue::Int(i as i128)).collect())
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TlaValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TlaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlaValue::Int(n) => write!(f, "{}", n),
            TlaValue::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
            TlaValue::Bool(true) => f.write_str("TRUE"),
            TlaValue::Bool(false) => f.write_str("FALSE"),
            TlaValue::Seq(items) => {
                f.write_str("<<")?;
                write_joined(f, items)?;
                f.write_str(">>")
            }
            TlaValue::Set(items) => {
                f.write_str("{")?;
                write_joined(f, items)?;
                f.write_str("}")
            }
            TlaValue::Record(fields) => {
                f.write_str("[")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} |-> {}", name, value)?;
                }
                f.write_str("]")
            }
            TlaValue::Function(values) => match values.split_first() {
                None => f.write_str("<<>>"),
                Some((first, rest)) if rest.iter().all(|v| v == first) => {
                    write!(f, "[i \\in 0..{} |-> {}]", values.len() - 1, first)
                }
                Some(_) => {
                    write!(f, "[i \\in 0..{} |-> <<", values.len() - 1)?;
                    write_joined(f, values)?;
                    f.write_str(">>[i + 1]]")
                }
            },
        }
    }
}

impl From<u64> for TlaValue {
    fn from(value: u64) -> Self {
        TlaValue::Int(value as i128)
    }
}

impl From<i64> for TlaValue {
    fn from(value: i64) -> Self {
        TlaValue::Int(value as i128)
    }
}

impl From<usize> for TlaValue {
    fn from(value: usize) -> Self {
        TlaValue::Int(value as i128)
    }
}

impl From<bool> for TlaValue {
    fn from(value: bool) -> Self {
        TlaValue::Bool(value)
    }
}

impl From<ServerState> for TlaValue {
    fn from(value: ServerState) -> Self {
        TlaValue::str(value.as_str())
    }
}

impl From<&OpLogEntry> for TlaValue {
    fn from(entry: &OpLogEntry) -> Self {
        TlaValue::Record(vec![
            ("id".to_string(), TlaValue::str(entry.server_id.as_str())),
            ("active".to_string(), entry.active.into()),
            ("slot".to_string(), entry.slot.into()),
            ("ballot".to_string(), entry.ballot.into()),
        ])
    }
}

impl From<&[OpLogEntry]> for TlaValue {
    fn from(log: &[OpLogEntry]) -> Self {
        TlaValue::Seq(log.iter().map(TlaValue::from).collect())
    }
}
