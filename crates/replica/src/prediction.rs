use driftlands_common::RenderPose;
use glam::Vec2;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Chase speed in world units per second.
    pub max_speed: f32,
    /// Authoritative jumps longer than this snap instead of chasing.
    pub snap_distance: f32,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            max_speed: 420.0,
            snap_distance: 256.0,
        }
    }
}

/// Drives the local entity's render position toward the latest
/// authoritative position. There is no movement simulation: the render
/// position only ever chases, never leads.
#[derive(Debug, Clone, Default)]
pub struct LocalPredictor {
    config: PredictionConfig,
    server_pos: Option<Vec2>,
    render_pos: Option<Vec2>,
    heading: f32,
    snap_pending: bool,
}

impl LocalPredictor {
    pub fn new(config: PredictionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Record the latest authoritative position.
    pub fn set_server_position(&mut self, pos: Vec2) {
        let far = match self.render_pos {
            None => true,
            Some(render) => render.distance(pos) > self.config.snap_distance,
        };
        if far {
            tracing::debug!(?pos, "local entity snaps");
            self.snap_pending = true;
        }
        self.server_pos = Some(pos);
    }

    /// Advance by `dt` seconds. Returns the render position, if known.
    pub fn step(&mut self, dt: f32) -> Option<Vec2> {
        let target = self.server_pos?;
        let render = match self.render_pos {
            Some(render) if !self.snap_pending => render,
            _ => {
                self.snap_pending = false;
                self.render_pos = Some(target);
                return self.render_pos;
            }
        };

        let delta = target - render;
        let distance = delta.length();
        let max_step = self.config.max_speed * dt.max(0.0);
        let next = if distance <= max_step {
            target
        } else {
            render + delta / distance * max_step
        };
        if distance > f32::EPSILON {
            self.heading = delta.y.atan2(delta.x);
        }
        self.render_pos = Some(next);
        self.render_pos
    }

    pub fn render_position(&self) -> Option<Vec2> {
        self.render_pos
    }

    pub fn server_position(&self) -> Option<Vec2> {
        self.server_pos
    }

    /// Render pose, heading along the last chase direction.
    pub fn render_pose(&self) -> Option<RenderPose> {
        self.render_pos.map(|p| RenderPose::new(p.x, p.y, self.heading))
    }

    /// Forget everything, e.g. when the controlled entity changes.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}
