//! Report: run summary for humans (log) and machines (JSON).

use std::path::Path;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::parser::ParseMetrics;
use crate::state::Regression;
use crate::trace::{CheckerVerdict, TlcExitStatus};
use super::context::Skipped;
use super::pipeline::{RunError, RunOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct ViolationSummary {
    pub snapshot_index: usize,
    pub server: String,
    #[serde(flatten)]
    pub regression: Regression,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckerSummary {
    Skipped,
    Passed {
        status: TlcExitStatus,
        duration_ms: u64,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub sources: Vec<String>,
    pub servers: Vec<String>,
    pub metrics: ParseMetrics,
    pub merged_events: usize,
    pub snapshots: usize,
    pub consistent: bool,
    pub violations: Vec<ViolationSummary>,
    pub skipped: Vec<Skipped>,
    pub trace_spec: String,
    pub trace_config: String,
    pub checker: CheckerSummary,
    pub exit_code: u8,
}

impl RunReport {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let ctx = &outcome.context;
        let checker = match &outcome.checker {
            None => CheckerSummary::Skipped,
            Some(Ok(CheckerVerdict { status, duration_ms, .. })) => CheckerSummary::Passed {
                status: *status,
                duration_ms: *duration_ms,
            },
            Some(Err(e)) => CheckerSummary::Failed {
                message: e.to_string(),
            },
        };

        Self {
            sources: ctx.sources.iter().map(|s| s.to_string()).collect(),
            servers: outcome.cluster.ids().iter().map(|id| id.to_string()).collect(),
            metrics: ctx.metrics.clone(),
            merged_events: ctx.merged_events,
            snapshots: ctx.snapshots,
            consistent: ctx.is_consistent(),
            violations: ctx
                .violations
                .iter()
                .map(|v| ViolationSummary {
                    snapshot_index: v.snapshot_index,
                    server: v.server_id.to_string(),
                    regression: v.regression,
                    location: v.event.location(),
                })
                .collect(),
            skipped: ctx.skipped.clone(),
            trace_spec: outcome.artifacts.spec.display().to_string(),
            trace_config: outcome.artifacts.config.display().to_string(),
            checker,
            exit_code: outcome.exit_code(),
        }
    }

    /// Log the summary at `info!`, findings at `warn!`/`error!`.
    pub fn log(&self) {
        info!(
            "Sources: {}, relevant lines: {}, events: {} merged into {} snapshot(s)",
            self.sources.len(),
            self.metrics.lines_matched,
            self.merged_events,
            self.snapshots
        );
        info!(
            "Skipped: {} malformed line(s), {} missing-field event(s), {} format-error event(s), {} unknown-server event(s)",
            self.metrics.malformed_lines,
            self.metrics.missing_field,
            self.metrics.format_errors,
            self.metrics.unknown_server
        );
        if self.metrics.non_utf8 > 0 {
            warn!("{} line(s) were not valid UTF-8", self.metrics.non_utf8);
        }
        if self.metrics.out_of_order > 0 {
            warn!(
                "{} line(s) were out of timestamp order within their source",
                self.metrics.out_of_order
            );
        }
        for v in &self.violations {
            warn!(
                "Violation at snapshot {}: server {} {} ({})",
                v.snapshot_index, v.server, v.regression, v.location
            );
        }
        info!("Trace written to {} and {}", self.trace_spec, self.trace_config);
        match &self.checker {
            CheckerSummary::Skipped => info!("TLC: skipped"),
            CheckerSummary::Passed { status, duration_ms } => {
                info!("TLC: {} in {}ms", status, duration_ms)
            }
            CheckerSummary::Failed { message } => error!("TLC: {}", message),
        }
        info!("Exit code: {}", self.exit_code);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), RunError> {
        let json = self.to_json().map_err(|e| RunError::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        std::fs::write(path, json).map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::event::{Action, LogEvent};
    use crate::parser::SourceId;
    use crate::runtime::context::RunContext;
    use crate::state::{reconstruct, Cluster};
    use crate::trace::{ArtifactPaths, CheckerError};

    fn event(line_no: usize, slot: u64) -> LogEvent {
        LogEvent {
            timestamp_ms: line_no as i64,
            source: SourceId::new(0, "s0.log"),
            line_no,
            raw: String::new(),
            action: Action::P2a,
            server_id: "0".into(),
            slot,
            ballot: 1,
        }
    }

    fn outcome(checker: Option<Result<CheckerVerdict, CheckerError>>) -> RunOutcome {
        let cluster = Cluster::new(vec!["0".into()]).unwrap();
        let events = vec![event(1, 5), event(2, 3)];
        let reconstruction = reconstruct(&events, &cluster).unwrap();

        let mut context = RunContext::new();
        context.sources.push(SourceId::new(0, "s0.log"));
        context.merged_events = events.len();
        context.snapshots = reconstruction.snapshots.len();
        context.violations = reconstruction.violations;

        RunOutcome {
            context,
            cluster,
            history: reconstruction.snapshots,
            artifacts: ArtifactPaths {
                spec: PathBuf::from("out/Trace.tla"),
                config: PathBuf::from("out/Trace.cfg"),
            },
            checker,
        }
    }

    #[test]
    fn test_report_lists_violations() {
        let report = RunReport::from_outcome(&outcome(None));
        assert!(!report.consistent);
        assert_eq!(report.exit_code, 2);
        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.snapshot_index, 1);
        assert_eq!(v.server, "0");
        assert_eq!(v.location, "s0.log:2");
        assert_eq!(
            v.regression,
            Regression::Slot {
                expected_at_least: 5,
                observed: 3
            }
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = RunReport::from_outcome(&outcome(Some(Err(CheckerError::NotFound {
            path: PathBuf::from("tla2tools.jar"),
        }))));
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["sources"][0], "s0.log");
        assert_eq!(json["snapshots"], 2);
        assert_eq!(json["violations"][0]["field"], "slot");
        assert_eq!(json["violations"][0]["expected_at_least"], 5);
        assert_eq!(json["violations"][0]["observed"], 3);
        assert_eq!(json["checker"]["outcome"], "failed");
        assert_eq!(json["trace_spec"], "out/Trace.tla");
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        RunReport::from_outcome(&outcome(None)).write_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["checker"]["outcome"], "skipped");
    }
}
