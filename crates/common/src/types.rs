use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Server-assigned identifier for an entity or world object.
///
/// Ids are opaque strings on the wire. Their `Ord` is plain lexicographic
/// order, which the sprite compositor relies on as its final tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transient position and heading used only for drawing.
///
/// Heading is in radians, 0 pointing along +x.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderPose {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
}

impl RenderPose {
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self { x, y, heading }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_orders_lexicographically() {
        let a = EntityId::new("a10");
        let b = EntityId::new("a9");
        assert!(a < b);
    }

    #[test]
    fn entity_id_serializes_as_plain_string() {
        let id = EntityId::new("player-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"player-7\"");
    }

    #[test]
    fn render_pose_default_is_origin() {
        let p = RenderPose::default();
        assert_eq!(p.position(), Vec2::ZERO);
        assert_eq!(p.heading, 0.0);
    }
}
