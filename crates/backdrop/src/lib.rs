//! Procedural backdrop: stars, nebula, dust and meteors.
//!
//! # Invariants
//! - Every generator is seeded from the world seed; the same seed and the
//!   same sequence of frames produce the same draw lists.
//! - Nebula clouds are baked once and only repositioned at draw time.
//! - Backdrop draws are in screen space and independent of the terrain.

mod dust;
mod mask;
mod meteors;
mod nebula;
mod osc;
mod stars;

use driftlands_common::{Rgba, Viewport};
use driftlands_render::{DrawCommand, DrawList};
use serde::Deserialize;

pub use dust::{DustConfig, DustField, DustMote};
pub use mask::{AlphaMask, MaskCache, MaskKey};
pub use meteors::{Meteor, MeteorConfig, MeteorShower};
pub use nebula::{NebulaBake, NebulaBaker, NebulaCloud, NebulaConfig, NebulaLayer, fractal_noise, value_noise};
pub use osc::Oscillator;
pub use stars::{Star, StarLayer, StarLayerConfig, Starfield, StarfieldConfig};

/// Errors from backdrop setup and bakes.
#[derive(Debug, thiserror::Error)]
pub enum BackdropError {
    #[error("invalid bake size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("invalid color {0:?}")]
    InvalidColor(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackdropConfig {
    pub clear_color: Rgba,
    pub stars: StarfieldConfig,
    pub nebula: NebulaConfig,
    pub dust: DustConfig,
    pub meteors: MeteorConfig,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            clear_color: Rgba::rgb(0.015, 0.02, 0.045),
            stars: StarfieldConfig::default(),
            nebula: NebulaConfig::default(),
            dust: DustConfig::default(),
            meteors: MeteorConfig::default(),
        }
    }
}

/// All backdrop layers for one session.
///
/// The nebula layer starts absent and is attached once its bake finishes.
#[derive(Debug, Clone)]
pub struct Backdrop {
    config: BackdropConfig,
    seed: u64,
    stars: Starfield,
    dust: DustField,
    meteors: MeteorShower,
    nebula: Option<NebulaLayer>,
}

impl Backdrop {
    pub fn new(seed: u64, config: BackdropConfig) -> Self {
        Self {
            stars: Starfield::generate(seed, &config.stars),
            dust: DustField::generate(seed, &config.dust),
            meteors: MeteorShower::new(seed, config.meteors.clone()),
            nebula: None,
            seed,
            config,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &BackdropConfig {
        &self.config
    }

    /// Place clouds for finished bakes.
    pub fn attach_nebula(&mut self, bake_keys: &[String]) {
        self.nebula = Some(NebulaLayer::place(self.seed, bake_keys, &self.config.nebula));
        tracing::debug!(bakes = bake_keys.len(), "nebula layer attached");
    }

    pub fn has_nebula(&self) -> bool {
        self.nebula.is_some()
    }

    pub fn update(&mut self, dt: f32, view: &Viewport) {
        self.meteors.update(dt, view.size);
    }

    /// Draw back to front: clear, nebula, stars, dust, meteors.
    pub fn draw(&self, view: &Viewport, time_s: f32, out: &mut DrawList) {
        out.push(DrawCommand::Clear {
            color: self.config.clear_color,
        });
        if let Some(nebula) = &self.nebula {
            nebula.draw(view, time_s, out);
        }
        self.stars.draw(view, time_s, out);
        self.dust.draw(view, time_s, out);
        self.meteors.draw(out);
    }
}

pub fn crate_info() -> &'static str {
    "driftlands-backdrop v0.1.0"
}
