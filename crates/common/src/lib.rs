//! Shared types and utilities for the driftlands client core.
//!
//! Everything in here is plain data or a pure function: ids, tile and chunk
//! coordinates, the screen/world viewport mapping, colors and the
//! deterministic hashing every seeded generator builds on.

pub mod color;
pub mod coords;
pub mod hash;
pub mod math;
pub mod types;
pub mod view;

pub use color::Rgba;
pub use coords::{ChunkCoord, TileCoord};
pub use hash::{hash2d, hash_str, splitmix64, unit_f32};
pub use math::{lerp_angle, shortest_angle_delta, smoothing_factor, wrap_toroidal};
pub use types::{EntityId, RenderPose};
pub use view::Viewport;

pub fn crate_info() -> &'static str {
    "driftlands-common v0.1.0"
}
