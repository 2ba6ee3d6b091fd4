//! Pretty: compact diagnostic text for snapshots.

use super::model::{OpLogEntry, SystemState};

/// One line per server: role, current slot and the collapsed log.
///
/// ```text
/// server 0: state=Leader, slot=2, log=[slot 1 entry 0, slot 2 entries 1-2]
/// server 1: state=Follower, slot=0, log=empty
/// ```
pub fn pretty_state(state: &SystemState) -> String {
    (0..state.n_servers)
        .map(|i| {
            let log = state.log_of(i);
            format!(
                "server {}: state={}, slot={}, log={}",
                i,
                state.state[i],
                state.current_slot[i],
                if log.is_empty() { "empty".to_string() } else { pretty_log(log) }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse consecutive entries sharing a slot into one range.
pub fn pretty_log(log: &[OpLogEntry]) -> String {
    let mut parts = Vec::new();
    let mut index = 0;
    for run in log.chunk_by(|a, b| a.slot == b.slot) {
        let slot = run[0].slot;
        if run.len() == 1 {
            parts.push(format!("slot {} entry {}", slot, index));
        } else {
            parts.push(format!("slot {} entries {}-{}", slot, index, index + run.len() - 1));
        }
        index += run.len();
    }
    format!("[{}]", parts.join(", "))
}
