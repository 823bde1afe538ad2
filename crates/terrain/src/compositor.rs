use driftlands_common::Viewport;
use driftlands_render::{Blend, DrawCommand, DrawList, ImageDraw, ImageRef, Rect};
use driftlands_stream::TileStore;
use glam::Vec2;

use crate::atlas::AtlasLayout;
use crate::rules::{Neighbors, RuleTable, TileChoice};

/// Counters for one terrain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainStats {
    pub tiles: usize,
    pub placeholders: usize,
}

/// Draws the visible part of the tile store.
#[derive(Debug, Clone)]
pub struct TerrainCompositor {
    layout: AtlasLayout,
    rules: RuleTable,
    seed: u64,
    /// World units per tile.
    tile_world_size: f32,
}

impl TerrainCompositor {
    pub fn new(layout: AtlasLayout, rules: RuleTable, seed: u64) -> Self {
        Self {
            layout,
            rules,
            seed,
            tile_world_size: layout.tile_size as f32,
        }
    }

    pub fn tile_world_size(&self) -> f32 {
        self.tile_world_size
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Tile containing a world position.
    pub fn world_to_tile(&self, world: Vec2) -> (i32, i32) {
        let t = world / self.tile_world_size;
        (t.x.floor() as i32, t.y.floor() as i32)
    }

    /// Inclusive tile range covering the viewport.
    pub fn visible_tiles(&self, view: &Viewport) -> ((i32, i32), (i32, i32)) {
        let (min, max) = view.world_bounds();
        (self.world_to_tile(min), self.world_to_tile(max))
    }

    /// Append one draw command per visible tile, row by row.
    pub fn compose(&self, store: &TileStore, view: &Viewport, out: &mut DrawList) -> TerrainStats {
        let _span = tracing::info_span!("terrain_composite").entered();
        let ((x0, y0), (x1, y1)) = self.visible_tiles(view);
        let screen_size = Vec2::splat(self.tile_world_size * view.scale);

        let mut stats = TerrainStats::default();
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                let focal = store.get_tile_id(tx, ty);
                let neighbors = Neighbors::sample(|dx, dy| store.get_tile_id(tx + dx, ty + dy));
                let world_min = Vec2::new(tx as f32, ty as f32) * self.tile_world_size;
                let dest = Rect::from_min_size(view.world_to_screen(world_min), screen_size);

                match self.rules.autotile(focal, &neighbors, tx, ty, self.seed) {
                    TileChoice::Atlas { index, rotation } => {
                        let mut draw = ImageDraw::new(ImageRef::Atlas, dest);
                        draw.src = Some(self.layout.region(index).to_rect());
                        draw.rotation = rotation;
                        out.image(draw);
                    }
                    TileChoice::Placeholder => {
                        out.push(DrawCommand::Rect {
                            dest,
                            color: self.rules.placeholder,
                            blend: Blend::Alpha,
                        });
                        stats.placeholders += 1;
                    }
                }
                stats.tiles += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftlands_render::QuarterTurn;
    use driftlands_stream::{StreamConfig, TileId, WorldMeta};

    /// 8x8 world, one chunk: water with a grass column at x = 2.
    fn island_store() -> TileStore {
        let meta = WorldMeta::for_tiles(8, 8, 8);
        let mut store = TileStore::new(meta, StreamConfig::default()).unwrap();
        let mut bytes = vec![TileId::WATER.0; 64];
        for y in 0..8 {
            bytes[y * 8 + 2] = TileId::GRASS.0;
        }
        let coord = store.preload_around_point(0, 0, 0)[0];
        store.complete_fetch(coord, Ok(bytes)).unwrap();
        store
    }

    fn compositor() -> TerrainCompositor {
        TerrainCompositor::new(AtlasLayout::default(), RuleTable::default(), 11)
    }

    #[test]
    fn visible_range_covers_viewport() {
        let comp = compositor();
        let view = Viewport::new(Vec2::new(64.0, 64.0), Vec2::new(128.0, 128.0), 1.0);
        assert_eq!(comp.visible_tiles(&view), ((0, 0), (4, 4)));
    }

    #[test]
    fn unstreamed_tiles_draw_placeholders() {
        let meta = WorldMeta::for_tiles(8, 8, 8);
        let store = TileStore::new(meta, StreamConfig::default()).unwrap();
        let view = Viewport::new(Vec2::new(16.0, 16.0), Vec2::new(32.0, 32.0), 1.0);
        let mut list = DrawList::new();
        let stats = compositor().compose(&store, &view, &mut list);
        assert_eq!(stats.tiles, stats.placeholders);
        assert_eq!(list.len(), stats.tiles);
    }

    #[test]
    fn shore_edges_face_the_land() {
        let store = island_store();
        // tile (3, 3) is water with grass to the west
        let view = Viewport::new(Vec2::new(3.5 * 32.0, 3.5 * 32.0), Vec2::new(31.0, 31.0), 1.0);
        let mut list = DrawList::new();
        compositor().compose(&store, &view, &mut list);
        assert_eq!(list.len(), 1);
        match &list.commands()[0] {
            DrawCommand::Image(draw) => assert_eq!(draw.rotation, QuarterTurn::CounterClockwise),
            other => panic!("expected atlas blit, got {other:?}"),
        }
    }

    #[test]
    fn tiles_at_world_edge_stay_plain() {
        // Neighbours outside the world are unresolved, so the edge is never drawn.
        let store = island_store();
        let rules = RuleTable::default();
        let n = Neighbors::sample(|dx, dy| store.get_tile_id(dx, 3 + dy));
        assert_eq!(n.west, TileId::UNRESOLVED);
        let choice = rules.autotile(TileId::WATER, &n, 0, 3, 11);
        match choice {
            TileChoice::Atlas { index, .. } => assert!(rules.secondary_plain.contains(&index)),
            TileChoice::Placeholder => panic!("water is known"),
        }
    }

    #[test]
    fn atlas_source_matches_layout() {
        let store = island_store();
        let comp = compositor();
        let view = Viewport::new(Vec2::new(2.5 * 32.0, 2.5 * 32.0), Vec2::new(31.0, 31.0), 1.0);
        let mut list = DrawList::new();
        comp.compose(&store, &view, &mut list);
        let DrawCommand::Image(draw) = &list.commands()[0] else {
            panic!("expected atlas blit");
        };
        let src = draw.src.unwrap();
        assert_eq!(src.w, 32.0);
        assert_eq!((src.x as u32 - 1) % 33, 0);
    }
}
