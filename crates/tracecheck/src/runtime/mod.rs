//! Runtime module: run lifecycle: CLI, boot, pipeline, report.

pub mod boot;
pub mod cli;
pub mod context;
pub mod pipeline;
pub mod report;

pub use cli::CliArgs;
pub use context::{RunContext, Skipped, SourceReport};
pub use pipeline::{run, RunError, RunInputs, RunOutcome, EXIT_CHECKER, EXIT_FATAL, EXIT_SUCCESS, EXIT_VIOLATIONS};
pub use report::RunReport;
