use driftlands_common::{Rgba, Viewport, splitmix64, wrap_toroidal};
use driftlands_render::{Blend, DrawCommand, DrawList, Rect};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Deserialize;

use crate::osc::{Oscillator, uniform};

/// One parallax layer of stars.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StarLayerConfig {
    /// Fraction of camera motion applied to this layer.
    pub parallax: f32,
    pub count: usize,
    /// Mixed into the world seed so layers are independent.
    pub salt: u64,
    pub min_size: f32,
    pub max_size: f32,
}

impl Default for StarLayerConfig {
    fn default() -> Self {
        Self {
            parallax: 0.1,
            count: 120,
            salt: 0x51a7,
            min_size: 0.6,
            max_size: 1.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    pub layers: Vec<StarLayerConfig>,
    /// Side of the toroidal tile the stars live in, in screen pixels.
    pub extent: f32,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        let layer = |parallax, count, salt, max_size| StarLayerConfig {
            parallax,
            count,
            salt,
            max_size,
            ..StarLayerConfig::default()
        };
        Self {
            layers: vec![
                layer(0.05, 160, 0x51a7_0001, 1.2),
                layer(0.12, 90, 0x51a7_0002, 1.6),
                layer(0.25, 40, 0x51a7_0003, 2.2),
            ],
            extent: 1536.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Star {
    /// Position inside the toroidal tile.
    pub pos: Vec2,
    pub size: f32,
    pub base: f32,
    pub color: Rgba,
    pub twinkle: Oscillator,
    pub breathe: Oscillator,
    pub flutter: Oscillator,
}

impl Star {
    /// Base brightness times the three oscillators.
    pub fn brightness(&self, time_s: f32) -> f32 {
        self.base * self.twinkle.value(time_s) * self.breathe.value(time_s) * self.flutter.value(time_s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StarLayer {
    pub parallax: f32,
    pub stars: Vec<Star>,
}

const STAR_TINTS: [Rgba; 4] = [
    Rgba::rgb(1.0, 1.0, 1.0),
    Rgba::rgb(0.8, 0.88, 1.0),
    Rgba::rgb(1.0, 0.93, 0.8),
    Rgba::rgb(0.85, 0.8, 1.0),
];

/// Parallax starfield regenerated from the world seed.
#[derive(Debug, Clone, PartialEq)]
pub struct Starfield {
    extent: f32,
    layers: Vec<StarLayer>,
}

impl Starfield {
    pub fn generate(seed: u64, config: &StarfieldConfig) -> Self {
        let extent = config.extent.max(1.0);
        let layers = config
            .layers
            .iter()
            .map(|layer| {
                let mut rng = Pcg32::seed_from_u64(splitmix64(seed ^ layer.salt));
                let stars = (0..layer.count)
                    .map(|_| Star {
                        pos: Vec2::new(rng.random_range(0.0..extent), rng.random_range(0.0..extent)),
                        size: uniform(&mut rng, layer.min_size, layer.max_size),
                        base: rng.random_range(0.35..1.0),
                        color: STAR_TINTS[rng.random_range(0..STAR_TINTS.len())],
                        twinkle: Oscillator::random(&mut rng, 0.3..1.2, 0.45),
                        breathe: Oscillator::random(&mut rng, 0.03..0.12, 0.3),
                        flutter: Oscillator::random(&mut rng, 2.5..6.0, 0.12),
                    })
                    .collect();
                StarLayer {
                    parallax: layer.parallax,
                    stars,
                }
            })
            .collect();
        Self { extent, layers }
    }

    pub fn layers(&self) -> &[StarLayer] {
        &self.layers
    }

    /// Screen position of a star's first copy, in `[0, extent)²`.
    pub fn wrapped(&self, star: &Star, parallax: f32, camera: Vec2) -> Vec2 {
        let p = star.pos - camera * parallax;
        Vec2::new(wrap_toroidal(p.x, self.extent), wrap_toroidal(p.y, self.extent))
    }

    pub fn draw(&self, view: &Viewport, time_s: f32, out: &mut DrawList) {
        for layer in &self.layers {
            for star in &layer.stars {
                let brightness = star.brightness(time_s);
                let first = self.wrapped(star, layer.parallax, view.center);
                // The toroidal tile repeats until it covers the viewport.
                let mut y = first.y;
                while y < view.size.y {
                    let mut x = first.x;
                    while x < view.size.x {
                        draw_star(star, Vec2::new(x, y), brightness, out);
                        x += self.extent;
                    }
                    y += self.extent;
                }
            }
        }
    }
}

fn draw_star(star: &Star, at: Vec2, brightness: f32, out: &mut DrawList) {
    out.push(DrawCommand::RadialGlow {
        center: at,
        radius: star.size * (2.0 + 4.0 * brightness),
        color: star.color.with_alpha(0.35 * brightness),
        blend: Blend::Additive,
    });
    let core = if star.size > 1.4 { 2.0 } else { 1.0 };
    out.push(DrawCommand::Rect {
        dest: Rect::new(at.x - core * 0.5, at.y - core * 0.5, core, core),
        color: star.color.with_alpha(brightness.min(1.0)),
        blend: Blend::Additive,
    });
}
