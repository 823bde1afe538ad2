use std::f32::consts::TAU;

use driftlands_common::{Rgba, Viewport, splitmix64, wrap_toroidal};
use driftlands_render::{Blend, DrawCommand, DrawList, Rect};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DustConfig {
    pub count: usize,
    /// Toroidal extent in screen pixels.
    pub extent: f32,
    pub parallax: f32,
    /// Maximum drift speed in pixels per second.
    pub drift_speed: f32,
    pub jitter_amp: f32,
    pub color: Rgba,
}

impl Default for DustConfig {
    fn default() -> Self {
        Self {
            count: 70,
            extent: 1024.0,
            parallax: 0.6,
            drift_speed: 8.0,
            jitter_amp: 3.0,
            color: Rgba::new(0.85, 0.85, 0.95, 0.35),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustMote {
    pub origin: Vec2,
    pub velocity: Vec2,
    pub jitter_freq: f32,
    pub jitter_phase: f32,
    pub size: f32,
    pub alpha: f32,
}

/// Slow drifting motes. A mote's position is a function of time only, so
/// the field needs no per-frame update.
#[derive(Debug, Clone, PartialEq)]
pub struct DustField {
    config: DustConfig,
    motes: Vec<DustMote>,
}

impl DustField {
    pub fn generate(seed: u64, config: &DustConfig) -> Self {
        let mut rng = Pcg32::seed_from_u64(splitmix64(seed ^ 0x6475_7374));
        let extent = config.extent.max(1.0);
        let motes = (0..config.count)
            .map(|_| {
                let heading = rng.random_range(0.0..TAU);
                let speed = rng.random_range(0.2..1.0) * config.drift_speed;
                DustMote {
                    origin: Vec2::new(rng.random_range(0.0..extent), rng.random_range(0.0..extent)),
                    velocity: Vec2::from_angle(heading) * speed,
                    jitter_freq: rng.random_range(0.1..0.5),
                    jitter_phase: rng.random_range(0.0..TAU),
                    size: if rng.random_bool(0.25) { 2.0 } else { 1.0 },
                    alpha: rng.random_range(0.4..1.0),
                }
            })
            .collect();
        Self {
            config: DustConfig {
                extent,
                ..config.clone()
            },
            motes,
        }
    }

    pub fn motes(&self) -> &[DustMote] {
        &self.motes
    }

    /// Screen position of a mote at `time_s` for a camera at `camera`.
    pub fn position(&self, mote: &DustMote, time_s: f32, camera: Vec2) -> Vec2 {
        let angle = TAU * mote.jitter_freq * time_s + mote.jitter_phase;
        let jitter = Vec2::new(angle.sin(), (angle * 1.3).cos()) * self.config.jitter_amp;
        let p = mote.origin + mote.velocity * time_s + jitter - camera * self.config.parallax;
        Vec2::new(
            wrap_toroidal(p.x, self.config.extent),
            wrap_toroidal(p.y, self.config.extent),
        )
    }

    pub fn draw(&self, view: &Viewport, time_s: f32, out: &mut DrawList) {
        for mote in &self.motes {
            let p = self.position(mote, time_s, view.center);
            if p.x >= view.size.x || p.y >= view.size.y {
                continue;
            }
            let color = self.config.color;
            out.push(DrawCommand::Rect {
                dest: Rect::new(p.x, p.y, mote.size, mote.size),
                color: color.with_alpha(color.a * mote.alpha),
                blend: Blend::Additive,
            });
        }
    }
}
