use std::fmt;
use std::sync::Arc;
use serde::Serialize;

use crate::event::ServerId;

/// Role of a replica at one point of the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ServerState {
    Leader,
    #[default]
    Follower,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Leader => "Leader",
            ServerState::Follower => "Follower",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest slot/ballot a replica reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SlotAndBallot {
    pub slot: u64,
    pub ballot: i64,
}

/// One record of a replica's replicated log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpLogEntry {
    pub server_id: ServerId,
    /// replica was leader when the entry was appended
    pub active: bool,
    pub slot: u64,
    pub ballot: i64,
}

/// Global state after applying one event.
///
/// Every per-server vector has exactly `n_servers` entries, indexed by the
/// cluster position of the server. Logs are shared between consecutive
/// snapshots and copied only for the server that appends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemState {
    pub n_servers: usize,
    /// Label of the action that produced this snapshot (empty for the initial state)
    pub action: String,
    /// Index of the acting server
    pub actor: Option<usize>,
    /// `file:line` of the event that produced this snapshot
    pub location: Option<String>,
    pub current_slot: Vec<u64>,
    pub log: Vec<Arc<Vec<OpLogEntry>>>,
    pub state: Vec<ServerState>,
    pub slot_and_ballot: Vec<SlotAndBallot>,
}

impl SystemState {
    /// No logs, every server a follower at slot 0 / ballot 0.
    pub fn initial(n_servers: usize) -> Self {
        Self {
            n_servers,
            action: String::new(),
            actor: None,
            location: None,
            current_slot: vec![0; n_servers],
            log: vec![Arc::new(Vec::new()); n_servers],
            state: vec![ServerState::Follower; n_servers],
            slot_and_ballot: vec![SlotAndBallot::default(); n_servers],
        }
    }

    pub fn log_of(&self, server: usize) -> &[OpLogEntry] {
        &self.log[server]
    }

    /// Leaders in this snapshot, by server index.
    pub fn leaders(&self) -> Vec<usize> {
        self.state
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == ServerState::Leader)
            .map(|(i, _)| i)
            .collect()
    }

    /// True when every per-server vector has `n_servers` entries.
    pub fn is_well_formed(&self) -> bool {
        let n = self.n_servers;
        self.current_slot.len() == n
            && self.log.len() == n
            && self.state.len() == n
            && self.slot_and_ballot.len() == n
    }
}
