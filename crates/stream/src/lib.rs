//! World tile store: chunked terrain streaming and tile lookups.
//!
//! # Invariants
//! - Lookups never block and never fail; anything unknown reads as the
//!   impassable [`TileId::UNRESOLVED`] sentinel.
//! - At most one fetch is in flight per chunk coordinate.
//! - Only [`TileStore::complete_fetch`] writes a chunk slot.

mod meta;
mod minimap;
mod registry;
mod store;

use driftlands_common::ChunkCoord;

pub use meta::WorldMeta;
pub use minimap::Minimap;
pub use registry::{TileId, TileRegistry, TileTypeDef};
pub use store::{StreamConfig, StreamStats, TerrainChunk, TileStore};

/// Transport-level failure reported by the host for one chunk request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request aborted")]
    Aborted,
}

/// Errors from tile store operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("fetch of chunk {coord:?} failed: {source}")]
    Fetch {
        coord: ChunkCoord,
        #[source]
        source: FetchError,
    },
    #[error("chunk {coord:?} has {actual} bytes, expected {expected}")]
    ChunkSize {
        coord: ChunkCoord,
        expected: usize,
        actual: usize,
    },
    #[error("completion for chunk {0:?} that was not in flight")]
    UnexpectedCompletion(ChunkCoord),
    #[error("invalid world meta: {0}")]
    InvalidMeta(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn crate_info() -> &'static str {
    "driftlands-stream v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("stream"));
    }

    #[test]
    fn fetch_error_display() {
        let err = StreamError::Fetch {
            coord: ChunkCoord::new(1, 2),
            source: FetchError::Status(404),
        };
        assert!(err.to_string().contains("404"));
    }
}
