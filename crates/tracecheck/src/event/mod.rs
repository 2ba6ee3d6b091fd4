//! Event normalization: untyped [`crate::parser::LogLine`] state into typed [`LogEvent`]s.

pub mod model;
pub mod normalize;

pub use model::{Action, EventError, LogEvent, ServerId};
pub use normalize::{normalize, normalize_source, parse_ballot, parse_slot, NormalizedSource};
