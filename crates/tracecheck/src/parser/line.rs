use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::parser::traits::*;
use super::metrics::{ParseMetrics, SkipReason};
use super::model::StateMap;
use super::{DATE_TOKEN, DEFAULT_MARKER, STATE_TOKEN, TIME_TOKEN, TIMESTAMP_FORMAT};

/// Parser for marker-tagged replica log lines.
#[derive(Debug, Clone)]
pub struct MarkerLineParser {
    marker: String,
}

impl MarkerLineParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for MarkerLineParser {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl LineParser for MarkerLineParser {
    fn matches(&self, raw: &str) -> bool {
        raw.contains(self.marker.as_str())
    }

    fn parse(&self, raw: &str, source: &SourceId, line_no: usize) -> Result<LogLine, ParseError> {
        let tokens: Vec<&str> = raw.split_whitespace().collect();

        let token = |position: usize, expected: &'static str| {
            tokens.get(position).copied().ok_or(ParseError::MissingToken {
                line_no,
                position,
                expected,
            })
        };

        let date = token(DATE_TOKEN, "date")?;
        let time = token(TIME_TOKEN, "time")?;
        let state = token(STATE_TOKEN, "state")?;

        let timestamp_ms = parse_timestamp(date, time).map_err(|reason| {
            ParseError::InvalidTimestamp {
                line_no,
                value: format!("{} {}", date, time),
                reason,
            }
        })?;

        let state = parse_state(state).map_err(|field| ParseError::MalformedState {
            line_no,
            field,
        })?;

        Ok(LogLine {
            timestamp_ms,
            source: source.clone(),
            line_no,
            raw: raw.trim_end().to_string(),
            state,
        })
    }
}

/// `YYYY/MM/DD` + `HH:MM:SS.ffffff` (UTC) to milliseconds since the epoch.
/// Sub-millisecond digits are truncated.
fn parse_timestamp(date: &str, time: &str) -> Result<i64, String> {
    let joined = format!("{} {}", date, time);
    NaiveDateTime::parse_from_str(&joined, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc().timestamp_millis())
        .map_err(|e| e.to_string())
}

/// Split `key:value[,key:value...]` into a [`StateMap`].
///
/// The first colon separates key from value; any further colons are part of
/// the value. Returns the offending field when one has no colon or an empty key.
pub fn parse_state(text: &str) -> Result<StateMap, String> {
    let mut state = StateMap::new();
    for field in text.split(',') {
        match field.split_once(':') {
            Some((key, value)) if !key.is_empty() => state.insert(key, value),
            _ => return Err(field.to_string()),
        }
    }
    Ok(state)
}

/// Result of parsing one source file.
#[derive(Debug, Default)]
pub struct ParsedSource {
    /// Parsed lines in file order.
    pub lines: Vec<LogLine>,
    /// Relevant lines that were skipped.
    pub errors: Vec<ParseError>,
}

/// Parse the raw bytes of one source, keeping file order.
///
/// Lines are decoded one at a time, so a stray invalid byte only costs the
/// line it sits on. Non-matching lines are dropped silently; matching lines
/// that fail to decode or parse are logged, counted in `metrics` and returned
/// in [`ParsedSource::errors`].
pub fn parse_source(
    parser: &dyn LineParser,
    data: &[u8],
    source: &SourceId,
    metrics: &mut ParseMetrics,
) -> ParsedSource {
    let mut parsed = ParsedSource::default();

    for (idx, raw) in split_lines(data).enumerate() {
        let line_no = idx + 1;
        metrics.record_scanned();

        let text = match std::str::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => {
                metrics.record_non_utf8();
                if !parser.matches(&String::from_utf8_lossy(raw)) {
                    debug!(source = %source, line = line_no, "Ignoring non-UTF-8 line");
                    continue;
                }
                metrics.record_matched();
                let err = ParseError::NonUtf8 {
                    line_no,
                    valid_up_to: e.valid_up_to(),
                };
                warn!(source = %source, "Skipping malformed line: {}", err);
                metrics.record_skip(SkipReason::MalformedLine);
                parsed.errors.push(err);
                continue;
            }
        };

        if !parser.matches(text) {
            continue;
        }
        metrics.record_matched();

        match parser.parse(text, source, line_no) {
            Ok(line) => parsed.lines.push(line),
            Err(e) => {
                warn!(source = %source, "Skipping malformed line: {}", e);
                metrics.record_skip(SkipReason::MalformedLine);
                parsed.errors.push(e);
            }
        }
    }

    parsed
}

/// Split on `\n`, dropping a trailing `\r` and the empty tail after a final newline.
fn split_lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let data = data.strip_suffix(b"\n").unwrap_or(data);
    data.split(|b| *b == b'\n')
        .filter(move |_| !data.is_empty())
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    const LINE: &str =
        "[TEST] 2024/03/05 10:20:30.123456 paxos.go:122: ID:1,action:P2a,slot:3,ballot:1.0.2";

    fn source() -> SourceId {
        SourceId::new(0, "server.1.log")
    }

    /// Inverse of the parser, in the layout the replicas print.
    fn format_line(timestamp_ms: i64, state: &StateMap) -> String {
        let ts = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap();
        let fields: Vec<String> = state.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
        format!(
            "[TEST] {} paxos.go:1: {}",
            ts.format("%Y/%m/%d %H:%M:%S%.6f"),
            fields.join(",")
        )
    }

    // ── Matching ─────────────────────────────────────────────────

    #[test]
    fn test_marker_matching() {
        let parser = MarkerLineParser::default();
        assert!(parser.matches(LINE));
        assert!(!parser.matches("[INFO] 2024/03/05 10:20:30.123456 node.go:1: started"));
    }

    #[test]
    fn test_custom_marker() {
        let parser = MarkerLineParser::new("[TRACE]");
        assert_eq!(parser.marker(), "[TRACE]");
        assert!(!parser.matches(LINE));
    }

    // ── Line parsing ─────────────────────────────────────────────

    #[test]
    fn test_parse_valid_line() {
        let parser = MarkerLineParser::default();
        let line = parser.parse(LINE, &source(), 4).unwrap();

        let expected = DateTime::parse_from_rfc3339("2024-03-05T10:20:30.123Z")
            .unwrap()
            .timestamp_millis();
        assert_eq!(line.timestamp_ms, expected);
        assert_eq!(line.line_no, 4);
        assert_eq!(line.source, source());
        assert_eq!(line.state.get("ID"), Some("1"));
        assert_eq!(line.state.get("action"), Some("P2a"));
        assert_eq!(line.state.get("ballot"), Some("1.0.2"));
    }

    #[test]
    fn test_sub_millisecond_digits_truncated() {
        let parser = MarkerLineParser::default();
        let a = parser
            .parse("[TEST] 2024/03/05 10:20:30.123001 f.go:1: ID:1", &source(), 1)
            .unwrap();
        let b = parser
            .parse("[TEST] 2024/03/05 10:20:30.123999 f.go:1: ID:1", &source(), 2)
            .unwrap();
        assert_eq!(a.timestamp_ms, b.timestamp_ms);
    }

    #[test]
    fn test_missing_state_token() {
        let parser = MarkerLineParser::default();
        let err = parser
            .parse("[TEST] 2024/03/05 10:20:30.123456 paxos.go:122:", &source(), 9)
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingToken { line_no: 9, position: STATE_TOKEN, expected: "state" }
        );
    }

    #[test]
    fn test_missing_time_token() {
        let parser = MarkerLineParser::default();
        let err = parser.parse("[TEST] 2024/03/05", &source(), 1).unwrap_err();
        assert!(matches!(err, ParseError::MissingToken { expected: "time", .. }));
    }

    #[test]
    fn test_invalid_timestamp() {
        let parser = MarkerLineParser::default();
        let err = parser
            .parse("[TEST] 2024-03-05 10:20:30.1 paxos.go:1: ID:1", &source(), 2)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidTimestamp { line_no: 2, .. }));
    }

    // ── State parsing ────────────────────────────────────────────

    #[test]
    fn test_parse_state_extra_colons_belong_to_value() {
        let state = parse_state("addr:tcp://127.0.0.1:1735,ID:1").unwrap();
        assert_eq!(state.get("addr"), Some("tcp://127.0.0.1:1735"));
        assert_eq!(state.get("ID"), Some("1"));
    }

    #[test]
    fn test_parse_state_rejects_field_without_colon() {
        assert_eq!(parse_state("ID:1,garbage").unwrap_err(), "garbage");
        assert_eq!(parse_state(":value").unwrap_err(), ":value");
    }

    #[test]
    fn test_parse_state_allows_empty_value() {
        let state = parse_state("ID:").unwrap();
        assert_eq!(state.get("ID"), Some(""));
    }

    // ── Round trip through a synthetic formatter ────────────────

    #[test]
    fn test_format_of_parse_reconstructs_line() {
        let parser = MarkerLineParser::default();
        let cases = [
            LINE,
            "[TEST] 1999/12/31 23:59:59.999000 x.go:9: ID:2,action:BecomeLeader,slot:0,ballot:1.0.0",
            "[TEST] 2024/01/01 00:00:00.000000 y.go:2: k:v:w,ID:1.3",
        ];

        for raw in cases {
            let line = parser.parse(raw, &source(), 1).unwrap();
            let again = parser.parse(&format_line(line.timestamp_ms, &line.state), &source(), 1).unwrap();
            assert_eq!(again.timestamp_ms, line.timestamp_ms, "timestamp mismatch for {}", raw);
            assert_eq!(again.state, line.state, "state mismatch for {}", raw);
        }
    }

    // ── Whole sources ────────────────────────────────────────────

    #[test]
    fn test_parse_source_skips_and_reports() {
        let text = format!(
            "[INFO] boot\n{}\n[TEST] broken\n[TEST] 2024/03/05 10:20:31.000000 p.go:1: ID:2,slot:4\n",
            LINE
        );
        let mut metrics = ParseMetrics::default();
        let parsed = parse_source(&MarkerLineParser::default(), text.as_bytes(), &source(), &mut metrics);

        assert_eq!(parsed.lines.len(), 2);
        assert_eq!(parsed.lines[0].line_no, 2);
        assert_eq!(parsed.lines[1].line_no, 4);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].line_no(), 3);

        assert_eq!(metrics.lines_scanned, 4);
        assert_eq!(metrics.lines_matched, 3);
        assert_eq!(metrics.malformed_lines, 1);
    }

    #[test]
    fn test_parse_source_empty_text() {
        let mut metrics = ParseMetrics::default();
        let parsed = parse_source(&MarkerLineParser::default(), b"", &source(), &mut metrics);
        assert!(parsed.lines.is_empty());
        assert!(parsed.errors.is_empty());
        assert_eq!(metrics.lines_scanned, 0);
    }

    #[test]
    fn test_parse_source_survives_invalid_utf8() {
        let mut data = Vec::new();
        data.extend_from_slice(LINE.as_bytes());
        data.extend_from_slice(b"\nreplica noise \xff\xfe here\r\n[TEST] \xff 2024/03/05\n");
        data.extend_from_slice(LINE.as_bytes());
        data.extend_from_slice(b"\r\n");

        let mut metrics = ParseMetrics::default();
        let parsed = parse_source(&MarkerLineParser::default(), &data, &source(), &mut metrics);

        let kept: Vec<_> = parsed.lines.iter().map(|l| l.line_no).collect();
        assert_eq!(kept, vec![1, 4]);
        assert_eq!(parsed.lines[1].raw, LINE);
        assert_eq!(parsed.errors, vec![ParseError::NonUtf8 { line_no: 3, valid_up_to: 7 }]);

        assert_eq!(metrics.lines_scanned, 4);
        assert_eq!(metrics.lines_matched, 3);
        assert_eq!(metrics.non_utf8, 2);
        assert_eq!(metrics.malformed_lines, 1);
    }
}
