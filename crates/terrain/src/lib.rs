//! Terrain compositor: neighbor-aware autotiling over the tile store.
//!
//! # Invariants
//! - Tile choice is a pure function of the focal tile, its eight
//!   neighbours, the tile coordinates and the world seed.
//! - A secondary tile next to anything unresolved draws plain, so no shore
//!   edge appears against a chunk that is still streaming.
//! - No tile is ever drawn with a half turn; the far shore has its own pool.

mod atlas;
mod compositor;
mod rules;

pub use atlas::{AtlasLayout, AtlasRegion};
pub use compositor::{TerrainCompositor, TerrainStats};
pub use rules::{Corner, Neighbors, RuleTable, ShoreCase, Side, TileChoice, classify_shore};

pub fn crate_info() -> &'static str {
    "driftlands-terrain v0.1.0"
}
