use std::fmt::Write as _;

use driftlands_common::Viewport;

use crate::draw::{DrawCommand, DrawList, ImageRef};

/// Renderer-agnostic interface. All backends implement this trait.
///
/// A renderer consumes a finished draw list and the frame's viewport. It
/// never feeds anything back into world or sync state.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame.
    fn render(&mut self, list: &DrawList, view: &Viewport) -> Self::Output;
}

/// Debug text renderer for tests, logs and the CLI.
///
/// Produces a summary of the draw list followed by at most `max_lines`
/// individual commands.
#[derive(Debug)]
pub struct DebugTextRenderer {
    pub max_lines: usize,
}

impl Default for DebugTextRenderer {
    fn default() -> Self {
        Self { max_lines: 40 }
    }
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&mut self, list: &DrawList, view: &Viewport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Frame ({} commands) ===", list.len());
        let _ = writeln!(
            out,
            "Camera: center=({:.1}, {:.1}) size={:.0}x{:.0} scale={:.2}",
            view.center.x, view.center.y, view.size.x, view.size.y, view.scale
        );
        for (kind, count) in list.kind_counts() {
            let _ = writeln!(out, "  {kind}: {count}");
        }

        for cmd in list.iter().take(self.max_lines) {
            let _ = writeln!(out, "  {}", describe(cmd));
        }
        if list.len() > self.max_lines {
            let _ = writeln!(out, "  ... {} more", list.len() - self.max_lines);
        }
        out
    }
}

fn describe(cmd: &DrawCommand) -> String {
    match cmd {
        DrawCommand::Clear { color } => format!("clear rgba({:.2}, {:.2}, {:.2})", color.r, color.g, color.b),
        DrawCommand::Rect { dest, color, .. } => format!(
            "rect ({:.1}, {:.1}) {:.1}x{:.1} alpha={:.2}",
            dest.x, dest.y, dest.w, dest.h, color.a
        ),
        DrawCommand::Image(draw) => {
            let name = match &draw.image {
                ImageRef::Atlas => "atlas".to_owned(),
                ImageRef::Sprite(path) => path.clone(),
                ImageRef::Baked(key) => format!("baked:{key}"),
            };
            let mut line = format!(
                "image {name} at ({:.1}, {:.1}) {:.1}x{:.1}",
                draw.dest.x, draw.dest.y, draw.dest.w, draw.dest.h
            );
            if let Some(src) = draw.src {
                let _ = write!(line, " src=({:.0}, {:.0})", src.x, src.y);
            }
            if draw.rotation.degrees() != 0 {
                let _ = write!(line, " rot={}", draw.rotation.degrees());
            }
            if draw.flip_x {
                line.push_str(" flip");
            }
            if draw.tint.is_some() {
                line.push_str(" tinted");
            }
            line
        }
        DrawCommand::RadialGlow { center, radius, color, .. } => format!(
            "glow ({:.1}, {:.1}) r={:.1} alpha={:.2}",
            center.x, center.y, radius, color.a
        ),
        DrawCommand::Trail { from, to, head_alpha, .. } => format!(
            "trail ({:.1}, {:.1}) -> ({:.1}, {:.1}) head={:.2}",
            from.x, from.y, to.x, to.y, head_alpha
        ),
    }
}
