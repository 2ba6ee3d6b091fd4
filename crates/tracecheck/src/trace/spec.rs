//! Spec: the trace module handed to TLC.
//!
//! The observed history becomes a chain of `StepN` actions. Step *n* is only
//! enabled at `traceIndex = n - 1`, must satisfy the protocol's next-state
//! action, and assigns the acting server's role/slot/log/ballot from
//! snapshot *n*. The trace is accepted when `traceIndex` reaches the last step.

use std::fmt::Write as _;

use crate::conf::TraceConfig;
use crate::state::{Cluster, SystemState};
use super::value::TlaValue;

pub const TRACE_INDEX: &str = "traceIndex";
pub const TRACE_SPEC: &str = "TraceSpec";
pub const TRACE_MATCHED: &str = "TraceMatched";

/// Render the trace module for `history` (one snapshot per event).
pub fn render_trace_module(
    history: &[SystemState],
    cluster: &Cluster,
    spec_module: &str,
    config: &TraceConfig,
) -> String {
    let vars = &config.variables;
    let n = cluster.len();
    let mut out = String::new();

    let header = format!(" MODULE {} ", config.module_name);
    let _ = writeln!(out, "{:-^72}", header);
    let _ = writeln!(
        out,
        "\\* Observed trace: {} step(s) over {} server(s), generated by trace-checker.",
        history.len(),
        n
    );
    let _ = writeln!(out, "EXTENDS {}, Naturals, Sequences, TLC", spec_module);
    out.push('\n');

    let _ = writeln!(out, "VARIABLE {}", TRACE_INDEX);
    out.push('\n');
    let _ = writeln!(
        out,
        "traceVars == <<{}, {}, {}, {}, {}>>",
        vars.role, vars.slot, vars.log, vars.ballot, TRACE_INDEX
    );
    let _ = writeln!(out, "TraceLength == {}", history.len());
    out.push('\n');

    // Server index i of this module is the i-th logged id
    for (i, id) in cluster.ids().iter().enumerate() {
        let _ = writeln!(out, "\\* server {} = {}", i, TlaValue::str(id.as_str()));
    }
    out.push('\n');

    render_init(&mut out, n, config);

    for (k, snapshot) in history.iter().enumerate() {
        render_step(&mut out, k + 1, snapshot, config);
    }

    let _ = writeln!(out, "TraceNext ==");
    if history.is_empty() {
        let _ = writeln!(out, "    FALSE");
    } else {
        for k in 1..=history.len() {
            let _ = writeln!(out, "    \\/ Step{}", k);
        }
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "{} == TraceInit /\\ [][TraceNext]_traceVars /\\ WF_traceVars(TraceNext)",
        TRACE_SPEC
    );
    out.push('\n');
    let _ = writeln!(out, "{} == <>({} = TraceLength)", TRACE_MATCHED, TRACE_INDEX);
    let _ = writeln!(out, "{}", "=".repeat(72));

    out
}

fn render_init(out: &mut String, n: usize, config: &TraceConfig) {
    let vars = &config.variables;
    let initial = SystemState::initial(n);

    let _ = writeln!(out, "TraceInit ==");
    if let Some(init) = &config.init_predicate {
        let _ = writeln!(out, "    /\\ {}", init);
    }
    let role = TlaValue::Function(initial.state.iter().copied().map(TlaValue::from).collect());
    let slot = TlaValue::Function(initial.current_slot.iter().copied().map(TlaValue::from).collect());
    let log = TlaValue::Function((0..n).map(|i| TlaValue::from(initial.log_of(i))).collect());
    let ballot = TlaValue::Function(
        initial.slot_and_ballot.iter().map(|sb| TlaValue::from(sb.ballot)).collect(),
    );
    let _ = writeln!(out, "    /\\ {} = {}", vars.role, role);
    let _ = writeln!(out, "    /\\ {} = {}", vars.slot, slot);
    let _ = writeln!(out, "    /\\ {} = {}", vars.log, log);
    let _ = writeln!(out, "    /\\ {} = {}", vars.ballot, ballot);
    let _ = writeln!(out, "    /\\ {} = 0", TRACE_INDEX);
    out.push('\n');
}

fn render_step(out: &mut String, k: usize, snapshot: &SystemState, config: &TraceConfig) {
    let vars = &config.variables;
    let Some(server) = snapshot.actor else {
        return;
    };

    let _ = writeln!(
        out,
        "\\* {}: {} by server {}{}",
        k,
        snapshot.action.replace(['\n', '\r'], " "),
        server,
        snapshot
            .location
            .as_deref()
            .map(|l| format!(" ({})", l))
            .unwrap_or_default()
    );
    let _ = writeln!(out, "Step{} ==", k);
    let _ = writeln!(out, "    /\\ {} = {}", TRACE_INDEX, k - 1);
    if let Some(next) = &config.next_action {
        let _ = writeln!(out, "    /\\ {}", next);
    }

    let assignments = [
        (&vars.role, TlaValue::from(snapshot.state[server])),
        (&vars.slot, TlaValue::from(snapshot.current_slot[server])),
        (&vars.log, TlaValue::from(snapshot.log_of(server))),
        (&vars.ballot, TlaValue::from(snapshot.slot_and_ballot[server].ballot)),
    ];
    for (var, value) in assignments {
        let _ = writeln!(out, "    /\\ {var}' = [{var} EXCEPT ![{}] = {}]", server, value);
    }
    let _ = writeln!(out, "    /\\ {}' = {}", TRACE_INDEX, k);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Action, LogEvent, ServerId};
    use crate::parser::SourceId;
    use crate::state::reconstruct;

    fn ev(server: &str, action: Action, slot: u64, ballot: i64) -> LogEvent {
        LogEvent {
            timestamp_ms: 0,
            source: SourceId::new(0, "s.log"),
            line_no: 7,
            raw: String::new(),
            action,
            server_id: ServerId::new(server),
            slot,
            ballot,
        }
    }

    fn cluster() -> Cluster {
        Cluster::new(vec!["0".into(), "1".into()]).unwrap()
    }

    #[test]
    fn test_module_frame() {
        let module = render_trace_module(&[], &cluster(), "Paxos", &TraceConfig::default());
        let first = module.lines().next().unwrap();
        assert!(first.starts_with("----") && first.contains(" MODULE Trace ") && first.ends_with("----"));
        assert!(module.contains("EXTENDS Paxos, Naturals, Sequences, TLC"));
        assert!(module.trim_end().ends_with(&"=".repeat(72)));
        assert!(module.contains("TraceLength == 0"));
        assert!(module.contains("TraceNext ==\n    FALSE"));
    }

    #[test]
    fn test_init_uses_initial_state() {
        let module = render_trace_module(&[], &cluster(), "Paxos", &TraceConfig::default());
        assert!(module.contains("    /\\ Init\n"));
        assert!(module.contains("/\\ state = [i \\in 0..1 |-> \"Follower\"]"));
        assert!(module.contains("/\\ slot = [i \\in 0..1 |-> 0]"));
        assert!(module.contains("/\\ log = [i \\in 0..1 |-> <<>>]"));
        assert!(module.contains("/\\ ballot = [i \\in 0..1 |-> 0]"));
        assert!(module.contains("/\\ traceIndex = 0"));
    }

    #[test]
    fn test_one_step_per_snapshot() {
        let events = vec![
            ev("0", Action::BecomeLeader, 0, 1),
            ev("0", Action::P2a, 1, 1),
            ev("1", Action::P2b, 1, 1),
        ];
        let history = reconstruct(&events, &cluster()).unwrap().snapshots;
        let module = render_trace_module(&history, &cluster(), "Paxos", &TraceConfig::default());

        assert!(module.contains("Step1 ==\n    /\\ traceIndex = 0\n    /\\ Next\n"));
        assert!(module.contains("/\\ state' = [state EXCEPT ![0] = \"Leader\"]"));
        assert!(module.contains("/\\ log' = [log EXCEPT ![0] = <<[id |-> \"0\", active |-> TRUE, slot |-> 1, ballot |-> 1]>>]"));
        assert!(module.contains("/\\ slot' = [slot EXCEPT ![1] = 1]"));
        assert!(module.contains("/\\ traceIndex' = 3"));
        assert!(module.contains("\\* 2: P2a by server 0 (s.log:7)"));
        assert!(module.contains("    \\/ Step1\n    \\/ Step2\n    \\/ Step3\n"));
        assert!(module.contains("TraceLength == 3"));
        assert!(!module.contains("Step4"));
    }

    #[test]
    fn test_custom_names_and_no_spec_actions() {
        let mut config = TraceConfig::default();
        config.module_name = "PaxosTrace".to_string();
        config.init_predicate = None;
        config.next_action = None;
        config.variables.role = "role".to_string();

        let history = reconstruct(&[ev("1", Action::BecomeLeader, 0, 2)], &cluster())
            .unwrap()
            .snapshots;
        let module = render_trace_module(&history, &cluster(), "Paxos", &config);

        assert!(module.contains(" MODULE PaxosTrace "));
        assert!(!module.contains("/\\ Init"));
        assert!(!module.contains("/\\ Next"));
        assert!(module.contains("/\\ role' = [role EXCEPT ![1] = \"Leader\"]"));
        assert!(module.contains("traceVars == <<role, slot, log, ballot, traceIndex>>"));
    }

    #[test]
    fn test_server_id_legend() {
        let cluster = Cluster::new(vec!["1.1".into(), "1.2".into()]).unwrap();
        let module = render_trace_module(&[], &cluster, "Paxos", &TraceConfig::default());
        assert!(module.contains("\\* server 0 = \"1.1\""));
        assert!(module.contains("\\* server 1 = \"1.2\""));
    }
}
