use serde::Serialize;

/// Why a line or event was left out of the trace.
///
/// Type-safe classification so counters cannot drift from the reasons the
/// pipeline actually reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Relevant line missing tokens or carrying a bad timestamp
    MalformedLine,
    /// Required key absent from the event state
    MissingField,
    /// Slot or ballot present but not in the expected shape
    Format,
    /// Event names a server outside the configured cluster
    UnknownServer,
}

/// Parse and normalization counters.
///
/// Each source worker owns its own instance; the run context folds them
/// together with [`ParseMetrics::absorb`] once every worker has finished, so
/// no counter is ever shared between threads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseMetrics {
    pub lines_scanned: u64,
    pub lines_matched: u64,
    pub events_normalized: u64,

    // Skips
    pub malformed_lines: u64,
    pub missing_field: u64,
    pub format_errors: u64,
    pub unknown_server: u64,

    /// Adjacent lines whose timestamps went backwards within one source
    pub out_of_order: u64,
    /// Lines that are not valid UTF-8, relevant or not
    pub non_utf8: u64,
}

impl ParseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_scanned(&mut self) {
        self.lines_scanned += 1;
    }

    #[inline]
    pub fn record_matched(&mut self) {
        self.lines_matched += 1;
    }

    #[inline]
    pub fn record_event(&mut self) {
        self.events_normalized += 1;
    }

    #[inline]
    pub fn record_non_utf8(&mut self) {
        self.non_utf8 += 1;
    }

    #[inline]
    pub fn record_out_of_order(&mut self, count: u64) {
        self.out_of_order += count;
    }

    #[inline]
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MalformedLine => self.malformed_lines += 1,
            SkipReason::MissingField => self.missing_field += 1,
            SkipReason::Format => self.format_errors += 1,
            SkipReason::UnknownServer => self.unknown_server += 1,
        }
    }

    /// Fold another worker's counters into this one.
    pub fn absorb(&mut self, other: &ParseMetrics) {
        self.lines_scanned += other.lines_scanned;
        self.lines_matched += other.lines_matched;
        self.events_normalized += other.events_normalized;
        self.malformed_lines += other.malformed_lines;
        self.missing_field += other.missing_field;
        self.format_errors += other.format_errors;
        self.unknown_server += other.unknown_server;
        self.out_of_order += other.out_of_order;
        self.non_utf8 += other.non_utf8;
    }

    /// Events dropped after a line was parsed (missing field + format).
    pub fn event_errors(&self) -> u64 {
        self.missing_field + self.format_errors
    }

    pub fn skipped_total(&self) -> u64 {
        self.malformed_lines + self.event_errors() + self.unknown_server
    }

    /// Share of relevant lines that made it into the trace.
    pub fn success_rate(&self) -> f64 {
        if self.lines_matched == 0 {
            return 1.0;
        }
        let kept = self.lines_matched.saturating_sub(self.skipped_total());
        kept as f64 / self.lines_matched as f64
    }
}
