//! Trace module: TLA+ rendering of a reconstructed history and the TLC runner.

pub mod value;
pub mod spec;
pub mod config;
pub mod emit;
pub mod runner;

pub use value::TlaValue;
pub use spec::{render_trace_module, TRACE_INDEX, TRACE_MATCHED, TRACE_SPEC};
pub use config::TlcConfig;
pub use emit::{spec_module_name, ArtifactPaths, EmitError, TraceArtifacts};
pub use runner::{resolve_jar, CheckerError, CheckerVerdict, TlcExitStatus, TlcRunner};
