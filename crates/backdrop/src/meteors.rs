use std::f32::consts::TAU;

use driftlands_common::{Rgba, splitmix64};
use driftlands_render::{Blend, DrawCommand, DrawList, Rect};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Deserialize;

use crate::osc::uniform;

const PALETTE: [Rgba; 4] = [
    Rgba::rgb(1.0, 0.95, 0.85),
    Rgba::rgb(0.7, 0.85, 1.0),
    Rgba::rgb(1.0, 0.75, 0.55),
    Rgba::rgb(0.75, 1.0, 0.85),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeteorConfig {
    /// Expected spawns per second.
    pub rate: f32,
    pub max_concurrent: usize,
    pub min_speed: f32,
    pub max_speed: f32,
    pub min_lifetime: f32,
    pub max_lifetime: f32,
    pub trail_length: f32,
    /// Chance a meteor enters from a screen edge instead of appearing inside.
    pub edge_chance: f64,
}

impl Default for MeteorConfig {
    fn default() -> Self {
        Self {
            rate: 0.2,
            max_concurrent: 3,
            min_speed: 280.0,
            max_speed: 620.0,
            min_lifetime: 0.6,
            max_lifetime: 1.5,
            trail_length: 90.0,
            edge_chance: 0.7,
        }
    }
}

/// A meteor in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Meteor {
    pub pos: Vec2,
    pub velocity: Vec2,
    pub age: f32,
    pub lifetime: f32,
    pub tint: Rgba,
}

impl Meteor {
    /// Fade envelope: ramps in over the first 15% of life, out over the last 35%.
    pub fn envelope(&self) -> f32 {
        let t = (self.age / self.lifetime.max(f32::EPSILON)).clamp(0.0, 1.0);
        let fade_in = (t / 0.15).min(1.0);
        let fade_out = ((1.0 - t) / 0.35).min(1.0);
        fade_in.min(fade_out)
    }
}

/// Random meteor spawner. Reproducible for a given seed and sequence of
/// `update` calls.
#[derive(Debug, Clone)]
pub struct MeteorShower {
    config: MeteorConfig,
    rng: Pcg32,
    meteors: Vec<Meteor>,
    spawned: u64,
}

impl MeteorShower {
    pub fn new(seed: u64, config: MeteorConfig) -> Self {
        Self {
            config,
            rng: Pcg32::seed_from_u64(splitmix64(seed ^ 0x6d65_7465)),
            meteors: Vec::new(),
            spawned: 0,
        }
    }

    pub fn meteors(&self) -> &[Meteor] {
        &self.meteors
    }

    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Advance by `dt` seconds inside a screen of `size` pixels.
    pub fn update(&mut self, dt: f32, size: Vec2) {
        for m in &mut self.meteors {
            m.age += dt;
            m.pos += m.velocity * dt;
        }
        self.meteors.retain(|m| m.age < m.lifetime);

        let chance = (self.config.rate * dt).clamp(0.0, 1.0);
        if self.meteors.len() < self.config.max_concurrent && self.rng.random::<f32>() < chance {
            let meteor = self.spawn(size);
            self.meteors.push(meteor);
            self.spawned += 1;
        }
    }

    fn spawn(&mut self, size: Vec2) -> Meteor {
        let cfg = &self.config;
        let rng = &mut self.rng;
        let speed = uniform(rng, cfg.min_speed, cfg.max_speed);
        let lifetime = uniform(rng, cfg.min_lifetime, cfg.max_lifetime);
        let tint = PALETTE[rng.random_range(0..PALETTE.len())];
        let w = size.x.max(1.0);
        let h = size.y.max(1.0);

        let (pos, heading) = if rng.random_bool(cfg.edge_chance.clamp(0.0, 1.0)) {
            let start = match rng.random_range(0..4) {
                0 => Vec2::new(rng.random_range(0.0..w), 0.0),
                1 => Vec2::new(w, rng.random_range(0.0..h)),
                2 => Vec2::new(rng.random_range(0.0..w), h),
                _ => Vec2::new(0.0, rng.random_range(0.0..h)),
            };
            let aim = Vec2::new(rng.random_range(0.2..0.8) * w, rng.random_range(0.2..0.8) * h);
            let dir = (aim - start).normalize_or(Vec2::X);
            (start, dir)
        } else {
            let start = Vec2::new(rng.random_range(0.0..w), rng.random_range(0.0..h));
            (start, Vec2::from_angle(rng.random_range(0.0..TAU)))
        };

        Meteor {
            pos,
            velocity: heading * speed,
            age: 0.0,
            lifetime,
            tint,
        }
    }

    pub fn draw(&self, out: &mut DrawList) {
        for m in &self.meteors {
            let env = m.envelope();
            let dir = m.velocity.normalize_or_zero();
            out.push(DrawCommand::Trail {
                from: m.pos - dir * self.config.trail_length,
                to: m.pos,
                width: 1.5,
                color: m.tint,
                tail_alpha: 0.0,
                head_alpha: 0.8 * env,
                blend: Blend::Additive,
            });
            let head = Rgba::new(
                (m.tint.r + 1.0) * 0.5,
                (m.tint.g + 1.0) * 0.5,
                (m.tint.b + 1.0) * 0.5,
                env,
            );
            out.push(DrawCommand::Rect {
                dest: Rect::new(m.pos.x - 1.0, m.pos.y - 1.0, 2.0, 2.0),
                color: head,
                blend: Blend::Additive,
            });
        }
    }
}
