use driftlands_common::smoothing_factor;
use glam::Vec2;

/// Turns refresh timestamps into clamped frame deltas.
#[derive(Debug, Clone)]
pub struct FrameClock {
    max_dt: f32,
    last_ms: Option<f64>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl FrameClock {
    pub fn new(max_dt: f32) -> Self {
        Self {
            max_dt: max_dt.max(0.0),
            last_ms: None,
        }
    }

    /// Seconds since the previous tick, clamped to `[0, max_dt]`.
    ///
    /// The first tick yields 0. A stall (background tab, debugger) yields
    /// `max_dt` instead of a huge catch-up step.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        if dt.is_finite() {
            dt.clamp(0.0, self.max_dt)
        } else {
            0.0
        }
    }

    pub fn last_ms(&self) -> Option<f64> {
        self.last_ms
    }

    pub fn max_dt(&self) -> f32 {
        self.max_dt
    }
}

/// World-space camera focus with exponential follow.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraState {
    pub target: Vec2,
    pub smoothed: Vec2,
    settled: bool,
}

impl CameraState {
    pub fn new(focus: Vec2) -> Self {
        Self {
            target: focus,
            smoothed: focus,
            settled: false,
        }
    }

    /// Move `smoothed` toward `target`. The first update snaps so the
    /// camera never sweeps in from the origin.
    pub fn update(&mut self, dt: f32, half_life_s: f32) -> Vec2 {
        if !self.settled {
            self.smoothed = self.target;
            self.settled = true;
            return self.smoothed;
        }
        let factor = smoothing_factor(dt, half_life_s);
        self.smoothed += (self.target - self.smoothed) * factor;
        self.smoothed
    }

    /// Jump straight to a point, e.g. after a teleport.
    pub fn snap_to(&mut self, focus: Vec2) {
        self.target = focus;
        self.smoothed = focus;
        self.settled = true;
    }
}
