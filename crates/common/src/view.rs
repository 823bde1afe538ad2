use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Screen/world mapping for one frame.
///
/// `size` is the viewport in CSS pixels and `scale` is CSS pixels per world
/// unit. A single uniform scale is used for both axes, so a drag along the
/// screen diagonal maps onto the world diagonal even when the backing canvas
/// has mismatched per-axis device pixel ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Camera focus in world space; maps to the screen center.
    pub center: Vec2,
    /// Viewport size in CSS pixels.
    pub size: Vec2,
    /// CSS pixels per world unit.
    pub scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            size: Vec2::new(1280.0, 720.0),
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(center: Vec2, size: Vec2, scale: f32) -> Self {
        Self {
            center,
            size,
            scale,
        }
    }

    pub fn with_center(self, center: Vec2) -> Self {
        Self { center, ..self }
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.center) * self.scale + self.size * 0.5
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        self.center + (screen - self.size * 0.5) / scale
    }

    /// Visible world rectangle as `(min, max)`.
    pub fn world_bounds(&self) -> (Vec2, Vec2) {
        (
            self.screen_to_world(Vec2::ZERO),
            self.screen_to_world(self.size),
        )
    }
}
