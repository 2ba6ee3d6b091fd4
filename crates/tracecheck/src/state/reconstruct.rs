//! Reconstruct: sequential fold of merged events into `SystemState` snapshots.
//!
//! Snapshot *i* is event *i* applied to snapshot *i-1*; the predecessor of
//! the first snapshot is [`SystemState::initial`]. Only the acting server's
//! entries change.
//!
//! Slot and ballot must never go backwards for a server. A regression is
//! recorded as a [`ConsistencyViolation`] and the fold carries on with the
//! regressed value, so later events are checked against the latest observation.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::event::{LogEvent, ServerId};
use super::cluster::Cluster;
use super::model::{OpLogEntry, ServerState, SlotAndBallot, SystemState};
use super::pretty::pretty_state;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconstructError {
    #[error("event at {location} names server {server_id}, which is not in the cluster")]
    UnknownServer { server_id: ServerId, location: String },
}

/// Which monotonic marker went backwards, with the previous and the new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum Regression {
    Slot { expected_at_least: u64, observed: u64 },
    Ballot { expected_at_least: i64, observed: i64 },
}

impl fmt::Display for Regression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regression::Slot { expected_at_least, observed } => {
                write!(f, "slot went from {} to {}", expected_at_least, observed)
            }
            Regression::Ballot { expected_at_least, observed } => {
                write!(f, "ballot went from {} to {}", expected_at_least, observed)
            }
        }
    }
}

/// A slot or ballot regression observed for one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyViolation {
    pub snapshot_index: usize,
    pub server: usize,
    pub server_id: ServerId,
    pub regression: Regression,
    pub event: LogEvent,
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot {}: server {} {} ({} at {})",
            self.snapshot_index,
            self.server_id,
            self.regression,
            self.event.action,
            self.event.location()
        )
    }
}

/// Snapshot history and every violation found while building it.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub snapshots: Vec<SystemState>,
    pub violations: Vec<ConsistencyViolation>,
}

impl Reconstruction {
    /// No slot or ballot regression was observed.
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Incremental form of [`reconstruct`]: feed events one at a time.
#[derive(Debug)]
pub struct Reconstructor<'a> {
    cluster: &'a Cluster,
    current: SystemState,
    out: Reconstruction,
}

impl<'a> Reconstructor<'a> {
    pub fn new(cluster: &'a Cluster) -> Self {
        Self {
            cluster,
            current: SystemState::initial(cluster.len()),
            out: Reconstruction::default(),
        }
    }

    /// Latest snapshot, or the initial state before any event.
    pub fn current(&self) -> &SystemState {
        &self.current
    }

    pub fn apply(&mut self, event: &LogEvent) -> Result<&SystemState, ReconstructError> {
        let server = self
            .cluster
            .index_of(&event.server_id)
            .ok_or_else(|| ReconstructError::UnknownServer {
                server_id: event.server_id.clone(),
                location: event.location(),
            })?;
        let snapshot_index = self.out.snapshots.len();

        let mut next = self.current.clone();
        next.action = event.action.label().to_string();
        next.actor = Some(server);
        next.location = Some(event.location());

        let recorded = next.slot_and_ballot[server];
        if event.slot < recorded.slot {
            self.record(snapshot_index, server, event, Regression::Slot {
                expected_at_least: recorded.slot,
                observed: event.slot,
            });
        }
        if event.ballot < recorded.ballot {
            self.record(snapshot_index, server, event, Regression::Ballot {
                expected_at_least: recorded.ballot,
                observed: event.ballot,
            });
        }

        if let Some(role) = event.action.role_change() {
            next.state[server] = role;
        }

        if event.action.advances_slot() {
            next.current_slot[server] = event.slot;
            Arc::make_mut(&mut next.log[server]).push(OpLogEntry {
                server_id: event.server_id.clone(),
                active: next.state[server] == ServerState::Leader,
                slot: event.slot,
                ballot: event.ballot,
            });
        }

        next.slot_and_ballot[server] = SlotAndBallot {
            slot: event.slot,
            ballot: event.ballot,
        };

        debug!(
            snapshot = snapshot_index,
            action = %event.action,
            "State after {}:\n{}",
            event.location(),
            pretty_state(&next)
        );

        self.out.snapshots.push(next.clone());
        self.current = next;
        Ok(&self.current)
    }

    fn record(&mut self, snapshot_index: usize, server: usize, event: &LogEvent, regression: Regression) {
        let violation = ConsistencyViolation {
            snapshot_index,
            server,
            server_id: event.server_id.clone(),
            regression,
            event: event.clone(),
        };
        warn!("Consistency violation: {}", violation);
        self.out.violations.push(violation);
    }

    pub fn finish(self) -> Reconstruction {
        self.out
    }
}

/// Fold the merged stream into one snapshot per event.
///
/// Fails only when an event names a server outside `cluster`; filter such
/// events out beforehand to keep the history aligned with the stream.
pub fn reconstruct(events: &[LogEvent], cluster: &Cluster) -> Result<Reconstruction, ReconstructError> {
    let mut reconstructor = Reconstructor::new(cluster);
    for event in events {
        reconstructor.apply(event)?;
    }
    Ok(reconstructor.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Action;
    use crate::parser::SourceId;

    fn cluster(n: usize) -> Cluster {
        Cluster::new((0..n).map(|i| ServerId::new(i.to_string())).collect()).unwrap()
    }

    fn ev(server: &str, action: Action, slot: u64, ballot: i64) -> LogEvent {
        LogEvent {
            timestamp_ms: 0,
            source: SourceId::new(0, format!("{}.log", server)),
            line_no: 1,
            raw: String::new(),
            action,
            server_id: ServerId::new(server),
            slot,
            ballot,
        }
    }

    // ── Basic folding ────────────────────────────────────────────

    #[test]
    fn test_one_snapshot_per_event() {
        let events = vec![
            ev("0", Action::BecomeLeader, 0, 1),
            ev("1", Action::P1b, 0, 1),
            ev("0", Action::P2a, 1, 1),
        ];
        let out = reconstruct(&events, &cluster(3)).unwrap();
        assert_eq!(out.snapshots.len(), 3);
        assert!(out.snapshots.iter().all(|s| s.is_well_formed() && s.n_servers == 3));
        assert!(out.is_consistent());
    }

    #[test]
    fn test_role_change_only_touches_actor() {
        let out = reconstruct(&[ev("1", Action::BecomeLeader, 0, 2)], &cluster(3)).unwrap();
        let snap = &out.snapshots[0];
        let initial = SystemState::initial(3);

        assert_eq!(snap.action, "BecomeLeader");
        assert_eq!(snap.actor, Some(1));
        assert_eq!(snap.state, vec![ServerState::Follower, ServerState::Leader, ServerState::Follower]);
        assert_eq!(snap.slot_and_ballot[1], SlotAndBallot { slot: 0, ballot: 2 });
        for i in [0, 2] {
            assert_eq!(snap.state[i], initial.state[i]);
            assert_eq!(snap.current_slot[i], initial.current_slot[i]);
            assert_eq!(snap.slot_and_ballot[i], initial.slot_and_ballot[i]);
            assert!(snap.log_of(i).is_empty());
        }
        // role change does not append
        assert!(snap.log_of(1).is_empty());
    }

    #[test]
    fn test_slot_advancing_appends_log_entry() {
        let events = vec![
            ev("0", Action::BecomeLeader, 0, 1),
            ev("0", Action::P2a, 1, 1),
            ev("1", Action::P2b, 1, 1),
        ];
        let out = reconstruct(&events, &cluster(2)).unwrap();

        let last = &out.snapshots[2];
        assert_eq!(last.current_slot, vec![1, 1]);
        assert_eq!(
            last.log_of(0),
            &[OpLogEntry { server_id: "0".into(), active: true, slot: 1, ballot: 1 }]
        );
        assert_eq!(
            last.log_of(1),
            &[OpLogEntry { server_id: "1".into(), active: false, slot: 1, ballot: 1 }]
        );
    }

    #[test]
    fn test_non_advancing_action_keeps_current_slot() {
        let out = reconstruct(&[ev("0", Action::P1a, 4, 1)], &cluster(1)).unwrap();
        let snap = &out.snapshots[0];
        assert_eq!(snap.current_slot[0], 0);
        assert_eq!(snap.slot_and_ballot[0], SlotAndBallot { slot: 4, ballot: 1 });
    }

    #[test]
    fn test_snapshots_are_independent() {
        let events = vec![ev("0", Action::P2a, 1, 1), ev("0", Action::P2a, 2, 1)];
        let out = reconstruct(&events, &cluster(1)).unwrap();
        assert_eq!(out.snapshots[0].log_of(0).len(), 1);
        assert_eq!(out.snapshots[1].log_of(0).len(), 2);
    }

    // ── Monotonicity ─────────────────────────────────────────────

    #[test]
    fn test_slot_regression_reported_once() {
        let events = vec![ev("0", Action::P2a, 5, 1), ev("0", Action::P2a, 3, 1)];
        let out = reconstruct(&events, &cluster(2)).unwrap();

        assert!(!out.is_consistent());
        assert_eq!(out.violations.len(), 1);
        let v = &out.violations[0];
        assert_eq!(v.server, 0);
        assert_eq!(v.server_id, ServerId::new("0"));
        assert_eq!(v.snapshot_index, 1);
        assert_eq!(v.regression, Regression::Slot { expected_at_least: 5, observed: 3 });
        assert_eq!(out.snapshots.len(), 2);
    }

    #[test]
    fn test_regressed_value_becomes_new_baseline() {
        let events = vec![
            ev("0", Action::P2a, 5, 1),
            ev("0", Action::P2a, 3, 1),
            ev("0", Action::P2a, 4, 1),
        ];
        let out = reconstruct(&events, &cluster(1)).unwrap();
        // 3 -> 4 is fine against the latest observation
        assert_eq!(out.violations.len(), 1);
        assert_eq!(out.snapshots[1].current_slot[0], 3);
        assert_eq!(out.snapshots[2].current_slot[0], 4);
    }

    #[test]
    fn test_ballot_regression() {
        let events = vec![ev("1", Action::P1a, 0, 4), ev("1", Action::P1b, 0, 2)];
        let out = reconstruct(&events, &cluster(2)).unwrap();
        assert_eq!(out.violations.len(), 1);
        assert_eq!(out.violations[0].regression, Regression::Ballot { expected_at_least: 4, observed: 2 });
    }

    #[test]
    fn test_slot_and_ballot_regression_both_recorded() {
        let events = vec![ev("0", Action::P2a, 5, 5), ev("0", Action::P2a, 1, 1)];
        let out = reconstruct(&events, &cluster(1)).unwrap();
        assert_eq!(out.violations.len(), 2);
        assert!(out.violations.iter().all(|v| v.snapshot_index == 1));
    }

    #[test]
    fn test_regressions_tracked_per_server() {
        let events = vec![ev("0", Action::P2a, 5, 1), ev("1", Action::P2a, 1, 1)];
        let out = reconstruct(&events, &cluster(2)).unwrap();
        assert!(out.is_consistent());
    }

    // ── Errors ───────────────────────────────────────────────────

    #[test]
    fn test_unknown_server_is_error() {
        let err = reconstruct(&[ev("9", Action::P1a, 0, 0)], &cluster(2)).unwrap_err();
        assert!(matches!(err, ReconstructError::UnknownServer { ref server_id, .. } if server_id.as_str() == "9"));
    }

    #[test]
    fn test_violation_display_mentions_values() {
        let events = vec![ev("0", Action::P2a, 5, 1), ev("0", Action::P2a, 3, 1)];
        let out = reconstruct(&events, &cluster(1)).unwrap();
        let text = out.violations[0].to_string();
        assert!(text.contains("slot went from 5 to 3"), "{}", text);
        assert!(text.contains("server 0"), "{}", text);
    }
}
