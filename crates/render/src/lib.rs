//! Rendering adapter: renderer-agnostic draw lists and the sprite layer.
//!
//! # Invariants
//! - Renderers consume draw lists; they never mutate world or sync state.
//! - Every drawable has a depth key with a total order (ground y, then x,
//!   then id), so the sprite layer is identical for any input order.
//! - A drawable whose image is not loaded is skipped, never an error.
//!
//! Backends implement [`Renderer`]; [`DebugTextRenderer`] is the headless
//! backend used by tests and the CLI.

mod catalog;
mod draw;
mod images;
mod renderer;
mod sprites;

pub use catalog::{CatalogError, CollisionShape, LightDef, ObjectCatalog, ObjectDef};
pub use draw::{Blend, DrawCommand, DrawList, ImageDraw, ImageRef, QuarterTurn, Rect, Shadow};
pub use images::{ImageCache, ImageInfo, ImageState};
pub use renderer::{DebugTextRenderer, Renderer};
pub use sprites::{
    DepthKey, EntityAppearance, EntitySprite, ObjectSprite, SpriteCompositor, SpriteConfig, SpriteStats,
    light_intensity,
};

pub fn crate_info() -> &'static str {
    "driftlands-render v0.1.0"
}
