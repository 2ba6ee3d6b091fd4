//! Normalize: required-field extraction and slot/ballot decoding.

use tracing::warn;

use crate::parser::{LogLine, ParseMetrics, SkipReason, StateMap};
use super::model::{Action, EventError, LogEvent, ServerId};

pub const ACTION_KEY: &str = "action";
pub const ID_KEY: &str = "ID";
pub const SLOT_KEY: &str = "slot";
pub const BALLOT_KEY: &str = "ballot";

/// Build a [`LogEvent`] from a parsed line.
///
/// `action`, `ID` and `slot` are required ([`EventError::MissingField`]);
/// a missing or short `ballot` is a [`EventError::Format`].
pub fn normalize(line: &LogLine) -> Result<LogEvent, EventError> {
    let action = required(&line.state, ACTION_KEY)?;
    let server_id = required(&line.state, ID_KEY)?;
    let slot = parse_slot(required(&line.state, SLOT_KEY)?)?;
    let ballot = match line.state.get(BALLOT_KEY) {
        Some(value) => parse_ballot(value)?,
        None => {
            return Err(EventError::Format {
                field: BALLOT_KEY,
                value: String::new(),
                reason: "ballot is absent".to_string(),
            })
        }
    };

    Ok(LogEvent {
        timestamp_ms: line.timestamp_ms,
        source: line.source.clone(),
        line_no: line.line_no,
        raw: line.raw.clone(),
        action: Action::parse(action),
        server_id: ServerId::new(server_id),
        slot,
        ballot,
    })
}

fn required<'a>(state: &'a StateMap, key: &'static str) -> Result<&'a str, EventError> {
    match state.get(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(EventError::MissingField(key)),
    }
}

/// Slot must be a non-negative integer.
pub fn parse_slot(value: &str) -> Result<u64, EventError> {
    value.parse::<u64>().map_err(|e| EventError::Format {
        field: SLOT_KEY,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Ballots are logged as `major.minor.round`; only the round is kept.
pub fn parse_ballot(value: &str) -> Result<i64, EventError> {
    let format_err = |reason: String| EventError::Format {
        field: BALLOT_KEY,
        value: value.to_string(),
        reason,
    };

    let round = value
        .split('.')
        .nth(2)
        .ok_or_else(|| format_err("expected major.minor.round".to_string()))?;

    round.parse::<i64>().map_err(|e| format_err(e.to_string()))
}

/// Events of one source plus what was dropped on the way.
#[derive(Debug, Default)]
pub struct NormalizedSource {
    pub events: Vec<LogEvent>,
    /// `(line_no, error)` for every skipped line
    pub errors: Vec<(usize, EventError)>,
}

/// Normalize every line of a source, keeping order and skipping bad events.
pub fn normalize_source(lines: &[LogLine], metrics: &mut ParseMetrics) -> NormalizedSource {
    let mut out = NormalizedSource::default();

    for line in lines {
        match normalize(line) {
            Ok(event) => {
                metrics.record_event();
                out.events.push(event);
            }
            Err(e) => {
                warn!(source = %line.source, line = line.line_no, "Skipping event: {}", e);
                metrics.record_skip(match e {
                    EventError::MissingField(_) => SkipReason::MissingField,
                    EventError::Format { .. } => SkipReason::Format,
                });
                out.errors.push((line.line_no, e));
            }
        }
    }

    out
}
