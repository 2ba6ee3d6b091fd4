//! Conf module: configuration model, loading and validation.

pub mod model;
pub mod load;

pub use model::{CheckerConfig, TraceConfig, VariableNames};
pub use load::ConfigError;
