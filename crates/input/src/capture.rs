use driftlands_common::Viewport;
use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Minimum time between repeated intents while the pointer is held.
    pub min_interval_ms: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { min_interval_ms: 100.0 }
    }
}

/// Raw pointer input in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Vec2),
    Move(Vec2),
    Up,
    /// Pointer lost (window blur, touch cancel); same as `Up`.
    Cancel,
}

/// Client to server request to move toward a world point.
///
/// Serializes as `{"type":"move","x":..,"y":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "move")]
pub struct MoveIntent {
    pub x: f32,
    pub y: f32,
}

impl MoveIntent {
    pub fn world(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Turns a held pointer drag into move intents: one on press, then at most
/// one per `min_interval_ms` while held.
#[derive(Debug, Clone, Default)]
pub struct DragCapture {
    config: InputConfig,
    held: Option<Vec2>,
    last_emit_ms: Option<f64>,
    emitted: u64,
}

impl DragCapture {
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn handle(&mut self, event: PointerEvent, now_ms: f64, view: &Viewport) -> Option<MoveIntent> {
        match event {
            PointerEvent::Down(screen) => Some(self.press(screen, now_ms, view)),
            PointerEvent::Move(screen) => {
                self.pointer_move(screen);
                None
            }
            PointerEvent::Up | PointerEvent::Cancel => {
                self.release();
                None
            }
        }
    }

    /// Start a drag. Always emits.
    pub fn press(&mut self, screen: Vec2, now_ms: f64, view: &Viewport) -> MoveIntent {
        self.held = Some(screen);
        self.emit(screen, now_ms, view)
    }

    /// Track the pointer; ignored unless a drag is active.
    pub fn pointer_move(&mut self, screen: Vec2) {
        if let Some(held) = self.held.as_mut() {
            *held = screen;
        }
    }

    /// Emit a repeat intent if the drag is held and the interval elapsed.
    /// The current view is used, so a moving camera keeps steering.
    pub fn tick(&mut self, now_ms: f64, view: &Viewport) -> Option<MoveIntent> {
        let screen = self.held?;
        let due = match self.last_emit_ms {
            Some(last) => now_ms - last >= self.config.min_interval_ms,
            None => true,
        };
        due.then(|| self.emit(screen, now_ms, view))
    }

    pub fn release(&mut self) {
        self.held = None;
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn emit(&mut self, screen: Vec2, now_ms: f64, view: &Viewport) -> MoveIntent {
        let world = view.screen_to_world(screen);
        self.last_emit_ms = Some(now_ms);
        self.emitted += 1;
        tracing::trace!(?world, "move intent");
        MoveIntent {
            x: world.x,
            y: world.y,
        }
    }
}
