//! Context: everything one run accumulates, passed explicitly between stages.

use serde::Serialize;

use crate::event::LogEvent;
use crate::parser::{ParseMetrics, SkipReason, SourceId};
use crate::state::ConsistencyViolation;

/// A line or event that was left out of the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub source: String,
    pub line_no: usize,
    pub reason: SkipReason,
    pub message: String,
}

/// Output of one source worker.
#[derive(Debug, Default)]
pub struct SourceReport {
    pub source: Option<SourceId>,
    /// Events in timestamp order
    pub events: Vec<LogEvent>,
    pub metrics: ParseMetrics,
    pub skipped: Vec<Skipped>,
}

impl SourceReport {
    pub fn new(source: SourceId) -> Self {
        Self {
            source: Some(source),
            ..Default::default()
        }
    }

    pub fn skip(&mut self, line_no: usize, reason: SkipReason, message: impl Into<String>) {
        let source = self
            .source
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_default();
        self.skipped.push(Skipped {
            source,
            line_no,
            reason,
            message: message.into(),
        });
    }

    pub fn rank(&self) -> usize {
        self.source.as_ref().map(|s| s.rank).unwrap_or(usize::MAX)
    }
}

/// Per-run state. One instance per pipeline invocation; nothing is global.
#[derive(Debug, Default)]
pub struct RunContext {
    pub sources: Vec<SourceId>,
    pub metrics: ParseMetrics,
    pub skipped: Vec<Skipped>,
    pub merged_events: usize,
    pub snapshots: usize,
    pub violations: Vec<ConsistencyViolation>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished worker's counters and diagnostics in, returning its events.
    pub fn absorb(&mut self, report: SourceReport) -> Vec<LogEvent> {
        if let Some(source) = report.source {
            self.sources.push(source);
        }
        self.metrics.absorb(&report.metrics);
        self.skipped.extend(report.skipped);
        report.events
    }

    pub fn skip_unknown_server(&mut self, event: &LogEvent) {
        self.metrics.record_skip(SkipReason::UnknownServer);
        self.skipped.push(Skipped {
            source: event.source.to_string(),
            line_no: event.line_no,
            reason: SkipReason::UnknownServer,
            message: format!("server {} is not in the cluster", event.server_id),
        });
    }

    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}
