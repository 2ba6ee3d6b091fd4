// Domain-driven module structure for the trace checker.

// Core pipeline
pub mod parser;
pub mod event;
pub mod merge;
pub mod state;
pub mod trace;

// Ambient
pub mod conf;
pub mod runtime;
