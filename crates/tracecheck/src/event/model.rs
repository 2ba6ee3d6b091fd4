use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;
use serde::Serialize;

use crate::parser::SourceId;
use crate::state::ServerState;

/// Replica identifier exactly as logged (`0`, `2`, `1.3`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Order ids segment by segment on `.`, numerically where both segments
    /// are numbers, so `1.10` sorts after `1.9` and `10` after `2`.
    pub fn natural_cmp(&self, other: &ServerId) -> Ordering {
        let mut lhs = self.0.split('.');
        let mut rhs = other.0.split('.');
        loop {
            match (lhs.next(), rhs.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(a), Some(b)) => {
                    let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
                        (Ok(x), Ok(y)) => x.cmp(&y),
                        _ => a.cmp(b),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
        }
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Protocol step a replica reported.
///
/// Labels outside the instrumented set are kept verbatim as `Other`; they
/// still update the replica's slot/ballot marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    BecomeLeader,
    BecomeFollower,
    /// Phase 1a: prepare with a new ballot
    P1a,
    /// Phase 1b: promise
    P1b,
    /// Phase 2a: leader proposes a value for a slot
    P2a,
    /// Phase 2b: acceptor accepts a slot
    P2b,
    /// Phase 3: slot committed
    P3,
    Other(String),
}

impl Action {
    pub fn parse(label: &str) -> Self {
        match label {
            "BecomeLeader" => Action::BecomeLeader,
            "BecomeFollower" => Action::BecomeFollower,
            "P1a" => Action::P1a,
            "P1b" => Action::P1b,
            "P2a" => Action::P2a,
            "P2b" => Action::P2b,
            "P3" => Action::P3,
            other => Action::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Action::BecomeLeader => "BecomeLeader",
            Action::BecomeFollower => "BecomeFollower",
            Action::P1a => "P1a",
            Action::P1b => "P1b",
            Action::P2a => "P2a",
            Action::P2b => "P2b",
            Action::P3 => "P3",
            Action::Other(label) => label,
        }
    }

    /// Role the acting replica takes on, for role-change actions.
    pub fn role_change(&self) -> Option<ServerState> {
        match self {
            Action::BecomeLeader => Some(ServerState::Leader),
            Action::BecomeFollower => Some(ServerState::Follower),
            _ => None,
        }
    }

    /// Whether the action moves the replica to its reported slot and appends
    /// to its log.
    pub fn advances_slot(&self) -> bool {
        matches!(self, Action::P2a | Action::P2b | Action::P3)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Action {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Typed view of one replica log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub timestamp_ms: i64,
    pub source: SourceId,
    pub line_no: usize,
    pub raw: String,
    pub action: Action,
    pub server_id: ServerId,
    pub slot: u64,
    /// Round component of the dotted ballot
    pub ballot: i64,
}

impl LogEvent {
    /// `file:line` of the originating log line.
    pub fn location(&self) -> String {
        format!("{}:{}", self.source, self.line_no)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("missing required field {0:?}")]
    MissingField(&'static str),

    #[error("field {field:?} has invalid value {value:?}: {reason}")]
    Format {
        field: &'static str,
        value: String,
        reason: String,
    },
}
