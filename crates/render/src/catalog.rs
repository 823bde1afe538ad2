use std::collections::BTreeMap;

use driftlands_common::Rgba;
use glam::Vec2;
use serde::Deserialize;

/// Errors from loading object definitions.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("object {id}: invalid light color {color:?}")]
    InvalidColor { id: String, color: String },
    #[error("object {id}: has neither a sprite nor animation frames")]
    NoSprite { id: String },
    #[error("duplicate object definition {0}")]
    Duplicate(String),
}

/// Declarative collision footprint. Consumed by the server; carried here so
/// debug overlays can show it.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CollisionShape {
    Circle { radius: f32 },
    Rect { w: f32, h: f32 },
}

/// Light emitted by an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDef {
    pub radius: f32,
    pub color: Rgba,
    pub intensity: f32,
    /// Relative flicker amplitude.
    pub flicker: f32,
}

/// A world object type, as served by the object definitions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDef {
    pub id: String,
    pub sprite: Option<String>,
    pub frames: Vec<String>,
    pub frame_ms: f32,
    pub size: Vec2,
    /// Fraction of the sprite size at which the world position sits.
    pub anchor: Vec2,
    pub collision: Option<CollisionShape>,
    pub light: Option<LightDef>,
    pub interactive: bool,
}

impl ObjectDef {
    /// Sprite path to show at `time_ms`, cycling animation frames.
    pub fn sprite_at(&self, time_ms: f64) -> Option<&str> {
        if !self.frames.is_empty() {
            let frame_ms = self.frame_ms.max(1.0) as f64;
            let idx = (time_ms.max(0.0) / frame_ms) as usize % self.frames.len();
            return Some(&self.frames[idx]);
        }
        self.sprite.as_deref()
    }

    /// World y where the object touches the ground.
    pub fn ground_y(&self, position: Vec2) -> f32 {
        position.y + (1.0 - self.anchor.y) * self.size.y
    }

    /// Top-left corner of the sprite in world space.
    pub fn origin(&self, position: Vec2) -> Vec2 {
        position - self.anchor * self.size
    }
}

#[derive(Deserialize)]
struct RawLight {
    radius: f32,
    #[serde(default = "default_light_color")]
    color: String,
    #[serde(default = "default_one")]
    intensity: f32,
    #[serde(default = "default_flicker")]
    flicker: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObjectDef {
    id: String,
    #[serde(default)]
    sprite: Option<String>,
    #[serde(default)]
    frames: Vec<String>,
    #[serde(default = "default_frame_ms", alias = "frame_ms")]
    frame_ms: f32,
    #[serde(alias = "size_px")]
    size_px: [f32; 2],
    #[serde(default = "default_anchor", alias = "anchor_x")]
    anchor_x: f32,
    #[serde(default = "default_one", alias = "anchor_y")]
    anchor_y: f32,
    #[serde(default)]
    collision: Option<CollisionShape>,
    #[serde(default)]
    light: Option<RawLight>,
    #[serde(default)]
    interactive: bool,
    #[serde(default)]
    pickupable: bool,
    #[serde(default)]
    usable: bool,
}

fn default_light_color() -> String {
    "#ffcc66".into()
}

fn default_one() -> f32 {
    1.0
}

fn default_anchor() -> f32 {
    0.5
}

fn default_flicker() -> f32 {
    0.15
}

fn default_frame_ms() -> f32 {
    120.0
}

impl TryFrom<RawObjectDef> for ObjectDef {
    type Error = CatalogError;

    fn try_from(raw: RawObjectDef) -> Result<Self, CatalogError> {
        if raw.sprite.is_none() && raw.frames.is_empty() {
            return Err(CatalogError::NoSprite { id: raw.id });
        }
        let light = match raw.light {
            Some(light) => {
                let color = Rgba::from_hex(&light.color).ok_or_else(|| CatalogError::InvalidColor {
                    id: raw.id.clone(),
                    color: light.color.clone(),
                })?;
                Some(LightDef {
                    radius: light.radius,
                    color,
                    intensity: light.intensity,
                    flicker: light.flicker,
                })
            }
            None => None,
        };
        Ok(Self {
            sprite: raw.sprite,
            frames: raw.frames,
            frame_ms: raw.frame_ms,
            size: Vec2::from(raw.size_px),
            anchor: Vec2::new(raw.anchor_x, raw.anchor_y),
            collision: raw.collision,
            light,
            interactive: raw.interactive || raw.pickupable || raw.usable,
            id: raw.id,
        })
    }
}

/// Lookup map of object definitions by id.
#[derive(Debug, Clone, Default)]
pub struct ObjectCatalog {
    defs: BTreeMap<String, ObjectDef>,
}

impl ObjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the object definitions endpoint body (a JSON list).
    pub fn from_json(body: &str) -> Result<Self, CatalogError> {
        let raw: Vec<RawObjectDef> = serde_json::from_str(body)?;
        let mut catalog = Self::new();
        for def in raw {
            catalog.insert(ObjectDef::try_from(def)?)?;
        }
        tracing::debug!(count = catalog.len(), "object catalog loaded");
        Ok(catalog)
    }

    pub fn insert(&mut self, def: ObjectDef) -> Result<(), CatalogError> {
        if self.defs.contains_key(&def.id) {
            return Err(CatalogError::Duplicate(def.id));
        }
        self.defs.insert(def.id.clone(), def);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ObjectDef> {
        self.defs.get(id)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Every sprite path referenced by any definition.
    pub fn sprite_paths(&self) -> impl Iterator<Item = &str> {
        self.defs
            .values()
            .flat_map(|d| d.sprite.iter().chain(d.frames.iter()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFS: &str = r##"[
        {"id": "torch", "frames": ["torch_0.png", "torch_1.png"], "frameMs": 100,
         "sizePx": [16, 32], "anchorX": 0.5, "anchorY": 1.0,
         "light": {"radius": 80, "color": "#ff9933", "intensity": 0.9}},
        {"id": "chest", "sprite": "chest.png", "sizePx": [24, 20], "anchorY": 0.5,
         "collision": {"shape": "rect", "w": 24, "h": 12}, "pickupable": true}
    ]"##;

    #[test]
    fn parse_definitions() {
        let catalog = ObjectCatalog::from_json(DEFS).unwrap();
        assert_eq!(catalog.len(), 2);

        let torch = catalog.get("torch").unwrap();
        assert_eq!(torch.size, Vec2::new(16.0, 32.0));
        let light = torch.light.unwrap();
        assert_eq!(light.radius, 80.0);
        assert_eq!(light.flicker, 0.15);
        assert!(!torch.interactive);

        let chest = catalog.get("chest").unwrap();
        assert!(chest.interactive);
        assert_eq!(chest.collision, Some(CollisionShape::Rect { w: 24.0, h: 12.0 }));
        assert_eq!(chest.anchor, Vec2::new(0.5, 0.5));
    }

    #[test]
    fn animation_frames_cycle() {
        let catalog = ObjectCatalog::from_json(DEFS).unwrap();
        let torch = catalog.get("torch").unwrap();
        assert_eq!(torch.sprite_at(0.0), Some("torch_0.png"));
        assert_eq!(torch.sprite_at(150.0), Some("torch_1.png"));
        assert_eq!(torch.sprite_at(250.0), Some("torch_0.png"));
    }

    #[test]
    fn ground_contact_follows_anchor() {
        let catalog = ObjectCatalog::from_json(DEFS).unwrap();
        let torch = catalog.get("torch").unwrap();
        let chest = catalog.get("chest").unwrap();
        // bottom-anchored: ground is the position itself
        assert_eq!(torch.ground_y(Vec2::new(0.0, 100.0)), 100.0);
        // center-anchored: ground is half the height below
        assert_eq!(chest.ground_y(Vec2::new(0.0, 100.0)), 110.0);
        assert_eq!(chest.origin(Vec2::new(100.0, 100.0)), Vec2::new(88.0, 90.0));
    }

    #[test]
    fn reject_bad_color() {
        let body = r#"[{"id": "lamp", "sprite": "l.png", "sizePx": [8, 8], "light": {"radius": 4, "color": "orange"}}]"#;
        assert!(matches!(
            ObjectCatalog::from_json(body),
            Err(CatalogError::InvalidColor { .. })
        ));
    }

    #[test]
    fn reject_spriteless_and_duplicates() {
        let body = r#"[{"id": "ghost", "sizePx": [8, 8]}]"#;
        assert!(matches!(ObjectCatalog::from_json(body), Err(CatalogError::NoSprite { .. })));

        let body = r#"[{"id": "a", "sprite": "a.png", "sizePx": [1, 1]},
                       {"id": "a", "sprite": "b.png", "sizePx": [1, 1]}]"#;
        assert!(matches!(ObjectCatalog::from_json(body), Err(CatalogError::Duplicate(_))));
    }

    #[test]
    fn sprite_paths_lists_frames_and_sprites() {
        let catalog = ObjectCatalog::from_json(DEFS).unwrap();
        let mut paths: Vec<_> = catalog.sprite_paths().collect();
        paths.sort();
        assert_eq!(paths, vec!["chest.png", "torch_0.png", "torch_1.png"]);
    }
}
