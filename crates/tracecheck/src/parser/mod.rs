//! Log line parsing.
//!
//! Turns the raw text of one replica log into structured [`LogLine`] records.
//! Only lines carrying the configured marker are relevant; everything else
//! the replica prints is ignored.
//!
//! # Architecture
//!
//! - `traits.rs`: the [`LineParser`] seam
//! - `line.rs`: marker filtering, tokenizing, timestamp and state parsing
//! - `model.rs`: `LogLine`, `SourceId`, `StateMap`, `ParseError`
//! - `metrics.rs`: per-source / per-run parse counters
//!
//! A line that fails to parse is skipped and reported; it never aborts
//! parsing of the rest of the file.

pub mod traits;
pub mod line;
pub mod metrics;
pub mod model;

// Re-export commonly used types
pub use traits::LineParser;
pub use line::{MarkerLineParser, parse_source, parse_state};
pub use metrics::{ParseMetrics, SkipReason};
pub use model::{LogLine, ParseError, SourceId, StateMap};

// Constants
pub const DEFAULT_MARKER: &str = "[TEST]";
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.f";

/// Whitespace token positions (0-based) of the instrumented line layout:
/// `[TEST] 2024/01/02 15:04:05.123456 paxos.go:122: ID:1,action:P2a,slot:3,ballot:1.0.2`
pub const DATE_TOKEN: usize = 1;
pub const TIME_TOKEN: usize = 2;
pub const STATE_TOKEN: usize = 4;
