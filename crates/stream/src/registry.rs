use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Terrain type id as stored in chunk bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u8);

impl TileId {
    pub const GRASS: TileId = TileId(0);
    pub const WATER: TileId = TileId(1);
    pub const SAND: TileId = TileId(2);
    pub const STONE: TileId = TileId(3);
    /// Returned for out-of-bounds and not-yet-streamed tiles. Always impassable.
    pub const UNRESOLVED: TileId = TileId(255);

    pub fn is_resolved(self) -> bool {
        self != Self::UNRESOLVED
    }
}

/// Static per-type movement and display metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TileTypeDef {
    pub name: String,
    pub blocks_movement: bool,
    pub move_cost: f32,
    /// Minimap pixel color.
    pub minimap_rgba: [u8; 4],
}

impl TileTypeDef {
    fn impassable() -> Self {
        Self {
            name: "unresolved".into(),
            blocks_movement: true,
            move_cost: f32::INFINITY,
            minimap_rgba: [0, 0, 0, 0],
        }
    }
}

/// Registry of known tile types. Unknown ids resolve to an impassable type.
#[derive(Debug, Clone)]
pub struct TileRegistry {
    defs: BTreeMap<TileId, TileTypeDef>,
    fallback: TileTypeDef,
}

impl Default for TileRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.insert(TileId::GRASS, "grass", false, 1.0, [72, 128, 56, 255]);
        registry.insert(TileId::WATER, "water", true, f32::INFINITY, [40, 84, 150, 255]);
        registry.insert(TileId::SAND, "sand", false, 1.4, [200, 184, 128, 255]);
        registry.insert(TileId::STONE, "stone", true, f32::INFINITY, [110, 110, 116, 255]);
        registry
    }
}

impl TileRegistry {
    pub fn empty() -> Self {
        Self {
            defs: BTreeMap::new(),
            fallback: TileTypeDef::impassable(),
        }
    }

    pub fn insert(
        &mut self,
        id: TileId,
        name: &str,
        blocks_movement: bool,
        move_cost: f32,
        minimap_rgba: [u8; 4],
    ) {
        self.defs.insert(
            id,
            TileTypeDef {
                name: name.to_owned(),
                blocks_movement,
                move_cost,
                minimap_rgba,
            },
        );
    }

    pub fn is_known(&self, id: TileId) -> bool {
        id.is_resolved() && self.defs.contains_key(&id)
    }

    pub fn get(&self, id: TileId) -> &TileTypeDef {
        if !id.is_resolved() {
            return &self.fallback;
        }
        self.defs.get(&id).unwrap_or(&self.fallback)
    }

    pub fn blocks_movement(&self, id: TileId) -> bool {
        self.get(id).blocks_movement
    }

    pub fn move_cost(&self, id: TileId) -> f32 {
        self.get(id).move_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_is_impassable() {
        let reg = TileRegistry::default();
        assert!(reg.blocks_movement(TileId::UNRESOLVED));
        assert!(reg.move_cost(TileId::UNRESOLVED).is_infinite());
        assert!(!reg.is_known(TileId::UNRESOLVED));
    }

    #[test]
    fn unknown_id_falls_back() {
        let reg = TileRegistry::default();
        assert!(reg.blocks_movement(TileId(42)));
        assert_eq!(reg.get(TileId(42)).name, "unresolved");
    }

    #[test]
    fn grass_is_walkable() {
        let reg = TileRegistry::default();
        assert!(!reg.blocks_movement(TileId::GRASS));
        assert_eq!(reg.move_cost(TileId::GRASS), 1.0);
        assert!(reg.is_known(TileId::WATER));
    }
}
