use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;

use driftlands_common::{RenderPose, Rgba, Viewport, hash_str, smoothing_factor, splitmix64, unit_f32};
use glam::Vec2;
use serde::Deserialize;

use crate::catalog::{LightDef, ObjectDef};
use crate::draw::{Blend, DrawCommand, DrawList, ImageDraw, ImageRef, Rect, Shadow};
use crate::images::ImageCache;

/// Offsets of the outline redraws around an interactive object.
const OUTLINE_OFFSETS: [(f32, f32); 8] = [
    (-1.0, -1.0),
    (0.0, -1.0),
    (1.0, -1.0),
    (-1.0, 0.0),
    (1.0, 0.0),
    (-1.0, 1.0),
    (0.0, 1.0),
    (1.0, 1.0),
];

/// Sprite compositor tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Position smoothing half-life for world objects.
    pub object_half_life_ms: f32,
    /// Position smoothing half-life for remote entities.
    pub entity_half_life_ms: f32,
    pub outline_color: Rgba,
    pub outline_shadow_blur: f32,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            object_half_life_ms: 40.0,
            entity_half_life_ms: 60.0,
            outline_color: Rgba::new(1.0, 0.95, 0.7, 0.85),
            outline_shadow_blur: 6.0,
        }
    }
}

/// A world object instance as seen by the compositor for one frame.
#[derive(Debug, Clone, Copy)]
pub struct ObjectSprite<'a> {
    pub id: &'a str,
    pub def: &'a ObjectDef,
    pub position: Vec2,
}

/// How an entity looks on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAppearance {
    pub sprite: String,
    pub size: Vec2,
}

/// An entity as seen by the compositor for one frame. `pose` is the
/// predicted pose for the local entity and the interpolated pose otherwise.
#[derive(Debug, Clone, Copy)]
pub struct EntitySprite<'a> {
    pub id: &'a str,
    pub pose: RenderPose,
    pub appearance: &'a EntityAppearance,
    pub local: bool,
}

/// Sort key of one drawable: ground-contact y, then x, then id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthKey<'a> {
    pub depth: f32,
    pub x: f32,
    pub id: &'a str,
}

impl DepthKey<'_> {
    /// Total draw order. Smaller keys draw first (further back).
    pub fn draw_order(&self, other: &DepthKey<'_>) -> Ordering {
        self.depth
            .total_cmp(&other.depth)
            .then(self.x.total_cmp(&other.x))
            .then_with(|| self.id.cmp(other.id))
    }
}

/// Per-frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpriteStats {
    pub drawn: usize,
    pub culled: usize,
    /// Drawables whose image is still loading or failed to load.
    pub skipped: usize,
}

enum Body<'a> {
    Object { def: &'a ObjectDef, at: Vec2 },
    Entity { sprite: &'a EntityAppearance, at: Vec2, heading: f32 },
}

struct Drawable<'a> {
    key: DepthKey<'a>,
    body: Body<'a>,
}

/// Builds the depth-sorted sprite layer of a frame.
///
/// Owns the smoothing state of non-local drawables, keyed by id. State for
/// ids missing from a frame is dropped, so a reappearing id snaps to its
/// first position again.
#[derive(Debug, Default)]
pub struct SpriteCompositor {
    config: SpriteConfig,
    smoothed_objects: HashMap<String, Vec2>,
    smoothed_entities: HashMap<String, Vec2>,
}

impl SpriteCompositor {
    pub fn new(config: SpriteConfig) -> Self {
        Self {
            config,
            smoothed_objects: HashMap::new(),
            smoothed_entities: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SpriteConfig {
        &self.config
    }

    /// Smoothed world position of a drawable, if it has smoothing state.
    pub fn smoothed_position(&self, id: &str) -> Option<Vec2> {
        self.smoothed_objects
            .get(id)
            .or_else(|| self.smoothed_entities.get(id))
            .copied()
    }

    /// Append the sprite layer for one frame to `out`.
    ///
    /// Depth keys come from the positions passed in, not the smoothed ones,
    /// so smoothing never reorders the layer.
    #[allow(clippy::too_many_arguments)]
    pub fn compose(
        &mut self,
        objects: &[ObjectSprite<'_>],
        entities: &[EntitySprite<'_>],
        view: &Viewport,
        time_ms: f64,
        dt: f32,
        images: &mut ImageCache,
        out: &mut DrawList,
    ) -> SpriteStats {
        let _span = tracing::info_span!("sprite_composite").entered();

        let object_factor = smoothing_factor(dt, self.config.object_half_life_ms / 1000.0);
        let entity_factor = smoothing_factor(dt, self.config.entity_half_life_ms / 1000.0);

        let mut drawables = Vec::with_capacity(objects.len() + entities.len());
        for obj in objects {
            let at = smooth(&mut self.smoothed_objects, obj.id, obj.position, object_factor);
            drawables.push(Drawable {
                key: DepthKey {
                    depth: obj.def.ground_y(obj.position),
                    x: obj.position.x,
                    id: obj.id,
                },
                body: Body::Object { def: obj.def, at },
            });
        }
        for ent in entities {
            let target = ent.pose.position();
            let at = if ent.local {
                target
            } else {
                smooth(&mut self.smoothed_entities, ent.id, target, entity_factor)
            };
            drawables.push(Drawable {
                key: DepthKey {
                    depth: target.y + ent.appearance.size.y * 0.5,
                    x: target.x,
                    id: ent.id,
                },
                body: Body::Entity {
                    sprite: ent.appearance,
                    at,
                    heading: ent.pose.heading,
                },
            });
        }

        let live_objects: HashSet<&str> = objects.iter().map(|o| o.id).collect();
        self.smoothed_objects.retain(|id, _| live_objects.contains(id.as_str()));
        let live_entities: HashSet<&str> = entities.iter().filter(|e| !e.local).map(|e| e.id).collect();
        self.smoothed_entities.retain(|id, _| live_entities.contains(id.as_str()));

        drawables.sort_by(|a, b| a.key.draw_order(&b.key));

        let screen = Rect::from_min_size(Vec2::ZERO, view.size);
        let mut stats = SpriteStats::default();
        for drawable in &drawables {
            match drawable.body {
                Body::Object { def, at } => {
                    self.draw_object(drawable.key.id, def, at, view, &screen, time_ms, images, out, &mut stats)
                }
                Body::Entity { sprite, at, heading } => {
                    let dest = world_rect(view, at - sprite.size * 0.5, sprite.size);
                    if !dest.intersects(&screen) {
                        stats.culled += 1;
                        continue;
                    }
                    if images.require(&sprite.sprite).is_none() {
                        stats.skipped += 1;
                        continue;
                    }
                    let mut draw = ImageDraw::new(ImageRef::Sprite(sprite.sprite.clone()), dest);
                    draw.flip_x = heading.cos() < 0.0;
                    out.image(draw);
                    stats.drawn += 1;
                }
            }
        }
        stats
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_object(
        &self,
        id: &str,
        def: &ObjectDef,
        at: Vec2,
        view: &Viewport,
        screen: &Rect,
        time_ms: f64,
        images: &mut ImageCache,
        out: &mut DrawList,
        stats: &mut SpriteStats,
    ) {
        let dest = world_rect(view, def.origin(at), def.size);
        let reach = def.light.map_or(0.0, |l| l.radius * view.scale);
        let bounds = Rect::new(dest.x - reach, dest.y - reach, dest.w + 2.0 * reach, dest.h + 2.0 * reach);
        if !bounds.intersects(screen) {
            stats.culled += 1;
            return;
        }

        if let Some(light) = &def.light {
            let intensity = light_intensity(light, id, time_ms).clamp(0.0, 1.0);
            out.push(DrawCommand::RadialGlow {
                center: dest.center(),
                radius: light.radius * view.scale,
                color: light.color.with_alpha(intensity),
                blend: Blend::Additive,
            });
        }

        let Some(path) = def.sprite_at(time_ms) else {
            stats.skipped += 1;
            return;
        };
        if images.require(path).is_none() {
            stats.skipped += 1;
            return;
        }

        let image = ImageRef::Sprite(path.to_owned());
        if def.interactive {
            for (i, (dx, dy)) in OUTLINE_OFFSETS.iter().enumerate() {
                let mut outline = ImageDraw::new(image.clone(), dest.offset(*dx, *dy));
                outline.tint = Some(self.config.outline_color);
                if i == 0 {
                    outline.shadow = Some(Shadow {
                        color: self.config.outline_color,
                        blur: self.config.outline_shadow_blur,
                    });
                }
                out.image(outline);
            }
        }
        out.image(ImageDraw::new(image, dest));
        stats.drawn += 1;
    }
}

fn smooth(state: &mut HashMap<String, Vec2>, id: &str, target: Vec2, factor: f32) -> Vec2 {
    match state.get_mut(id) {
        Some(pos) => {
            *pos += (target - *pos) * factor;
            *pos
        }
        None => {
            state.insert(id.to_owned(), target);
            target
        }
    }
}

fn world_rect(view: &Viewport, world_min: Vec2, world_size: Vec2) -> Rect {
    Rect::from_min_size(view.world_to_screen(world_min), world_size * view.scale)
}

/// Flickering light intensity: two summed sines whose frequencies and
/// phases are seeded from the instance id.
pub fn light_intensity(light: &LightDef, id: &str, time_ms: f64) -> f32 {
    let seed = hash_str(id);
    let h1 = splitmix64(seed);
    let h2 = splitmix64(h1);
    let h3 = splitmix64(h2);
    let h4 = splitmix64(h3);
    let f1 = 0.7 + unit_f32(h1) * 1.3;
    let f2 = 2.3 + unit_f32(h2) * 2.7;
    let p1 = unit_f32(h3) * TAU;
    let p2 = unit_f32(h4) * TAU;
    let t = (time_ms / 1000.0) as f32;
    let wave = 0.6 * (TAU * f1 * t + p1).sin() + 0.4 * (TAU * f2 * t + p2).sin();
    light.intensity * (1.0 + light.flicker * wave)
}
