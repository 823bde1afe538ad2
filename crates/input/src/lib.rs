//! Input capture: pointer drags mapped to move intents for the server.
//!
//! # Invariants
//! - Consumers see move intents, never raw pointer events.
//! - Screen to world conversion uses the camera center and one uniform
//!   scale, so diagonal drags stay diagonal.
//! - Input feeds the server, never the render path.

mod capture;

pub use capture::{DragCapture, InputConfig, MoveIntent, PointerEvent};

pub fn crate_info() -> &'static str {
    "driftlands-input v0.1.0"
}
