use driftlands_common::Rgba;
use glam::Vec2;

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self::new(min.x, min.y, size.x, size.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Compositing mode for a draw command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    #[default]
    Alpha,
    Additive,
}

/// Quarter-turn rotations available to tile blits.
///
/// There is deliberately no half turn: the one tile case that would need it
/// is drawn from a dedicated variant pool instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuarterTurn {
    #[default]
    None,
    /// +90°, clockwise on screen.
    Clockwise,
    /// -90°, counter-clockwise on screen.
    CounterClockwise,
}

impl QuarterTurn {
    pub fn degrees(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Clockwise => 90,
            Self::CounterClockwise => -90,
        }
    }
}

/// Source image of a blit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageRef {
    /// The terrain sprite sheet.
    Atlas,
    /// A sprite loaded by path through the image cache.
    Sprite(String),
    /// An offscreen bake (nebula clouds), addressed by key.
    Baked(String),
}

/// Drop shadow applied to a blit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Rgba,
    pub blur: f32,
}

/// An image blit with its per-draw effects.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDraw {
    pub image: ImageRef,
    /// Source sub-rectangle; `None` blits the whole image.
    pub src: Option<Rect>,
    pub dest: Rect,
    pub alpha: f32,
    pub flip_x: bool,
    pub rotation: QuarterTurn,
    pub blend: Blend,
    /// Replace the image color with a flat tint, keeping its alpha.
    pub tint: Option<Rgba>,
    pub shadow: Option<Shadow>,
}

impl ImageDraw {
    pub fn new(image: ImageRef, dest: Rect) -> Self {
        Self {
            image,
            src: None,
            dest,
            alpha: 1.0,
            flip_x: false,
            rotation: QuarterTurn::None,
            blend: Blend::Alpha,
            tint: None,
            shadow: None,
        }
    }
}

/// One renderer-agnostic draw operation, in screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole target.
    Clear { color: Rgba },
    Rect {
        dest: Rect,
        color: Rgba,
        blend: Blend,
    },
    Image(ImageDraw),
    /// Radial gradient from `color` at the center to transparent at `radius`.
    RadialGlow {
        center: Vec2,
        radius: f32,
        color: Rgba,
        blend: Blend,
    },
    /// Line whose alpha ramps from `tail_alpha` at `from` to `head_alpha` at `to`.
    Trail {
        from: Vec2,
        to: Vec2,
        width: f32,
        color: Rgba,
        tail_alpha: f32,
        head_alpha: f32,
        blend: Blend,
    },
}

impl DrawCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Clear { .. } => "clear",
            Self::Rect { .. } => "rect",
            Self::Image(_) => "image",
            Self::RadialGlow { .. } => "glow",
            Self::Trail { .. } => "trail",
        }
    }
}

/// Ordered list of draw commands for one frame. Later commands draw on top.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn image(&mut self, draw: ImageDraw) {
        self.commands.push(DrawCommand::Image(draw));
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter()
    }

    /// Number of commands of each kind, sorted by kind name.
    pub fn kind_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for cmd in &self.commands {
            *counts.entry(cmd.kind()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn draw_list_counts_kinds() {
        let mut list = DrawList::new();
        list.push(DrawCommand::Clear { color: Rgba::BLACK });
        list.image(ImageDraw::new(ImageRef::Atlas, Rect::new(0.0, 0.0, 1.0, 1.0)));
        list.image(ImageDraw::new(ImageRef::Atlas, Rect::new(1.0, 0.0, 1.0, 1.0)));
        assert_eq!(list.kind_counts(), vec![("clear", 1), ("image", 2)]);
    }

    #[test]
    fn quarter_turns_never_half() {
        for turn in [QuarterTurn::None, QuarterTurn::Clockwise, QuarterTurn::CounterClockwise] {
            assert_ne!(turn.degrees().abs(), 180);
        }
    }
}
