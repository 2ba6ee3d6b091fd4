use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use serde::Serialize;

/// Identity of one input log.
///
/// `rank` is the caller-supplied position of the file on the command line and
/// is what the merger uses to break timestamp ties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceId {
    pub rank: usize,
    pub location: Arc<str>,
}

impl SourceId {
    pub fn new(rank: usize, location: impl Into<Arc<str>>) -> Self {
        Self {
            rank,
            location: location.into(),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Ordered `key:value` fields exactly as the replica printed them.
///
/// This is the untyped bridge between text and [`crate::event::LogEvent`];
/// validation of individual fields happens in the normalizer, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateMap(Vec<(String, String)>);

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. A repeated key keeps its first position and takes the
    /// latest value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = StateMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// One relevant line of a replica log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Milliseconds since the Unix epoch (UTC).
    pub timestamp_ms: i64,
    pub source: SourceId,
    /// 1-based line number within the source file
    pub line_no: usize,
    pub raw: String,
    pub state: StateMap,
}

/// A relevant line that could not be turned into a [`LogLine`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line_no}: missing {expected} (token {position})")]
    MissingToken {
        line_no: usize,
        position: usize,
        expected: &'static str,
    },

    #[error("line {line_no}: invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        line_no: usize,
        value: String,
        reason: String,
    },

    #[error("line {line_no}: state field {field:?} is not key:value")]
    MalformedState { line_no: usize, field: String },

    #[error("line {line_no}: invalid UTF-8 after byte {valid_up_to}")]
    NonUtf8 { line_no: usize, valid_up_to: usize },
}

impl ParseError {
    pub fn line_no(&self) -> usize {
        match self {
            ParseError::MissingToken { line_no, .. }
            | ParseError::InvalidTimestamp { line_no, .. }
            | ParseError::MalformedState { line_no, .. }
            | ParseError::NonUtf8 { line_no, .. } => *line_no,
        }
    }
}
