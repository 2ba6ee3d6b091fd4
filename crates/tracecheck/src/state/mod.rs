//! State reconstruction: folding the merged event stream into snapshots.
//!
//! - `model.rs`: `ServerState`, `SlotAndBallot`, `OpLogEntry`, `SystemState`
//! - `cluster.rs`: server id → array index registry
//! - `reconstruct.rs`: the sequential fold and monotonicity checks
//! - `pretty.rs`: compact diagnostic rendering of a snapshot

pub mod model;
pub mod cluster;
pub mod reconstruct;
pub mod pretty;

pub use model::{OpLogEntry, ServerState, SlotAndBallot, SystemState};
pub use cluster::{Cluster, ClusterError};
pub use reconstruct::{
    reconstruct, ConsistencyViolation, Reconstruction, Reconstructor, ReconstructError, Regression,
};
pub use pretty::{pretty_log, pretty_state};
