//! Replica: the client's view of server state.
//!
//! # Invariants
//! - Snapshot histories hold strictly increasing timestamps; stale samples
//!   are rejected by value, not by arrival order.
//! - Extrapolation never runs past the configured window, and heading is
//!   never extrapolated.
//! - An entity leaving the authoritative set loses its history at once.
//! - The local entity is never simulated, only chased toward the server.

mod interpolator;
mod objects;
mod prediction;
mod protocol;
mod state;

pub use interpolator::{InterpolationConfig, RemoteInterpolator, Snapshot, SnapshotBuffer};
pub use objects::{ObjectInstance, ObjectMirror};
pub use prediction::{LocalPredictor, PredictionConfig};
pub use protocol::{EntityUpdate, ObjectWire, ServerMessage};
pub use state::{ReplicaConfig, ReplicaState, ReplicaStats, ServerClock};

/// Errors from decoding server messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn crate_info() -> &'static str {
    "driftlands-replica v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("replica"));
    }
}
