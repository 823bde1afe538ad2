use driftlands_common::ChunkCoord;
use image::{Rgba, RgbaImage};

use crate::registry::TileRegistry;
use crate::store::TileStore;

/// One-pixel-per-tile raster of the streamed world.
///
/// Redraws only the chunks the store reports as changed since the last
/// refresh; a full repaint happens on the first refresh or when the store's
/// change log no longer reaches back to the drawn version.
#[derive(Debug, Clone)]
pub struct Minimap {
    image: RgbaImage,
    chunk_size: u32,
    drawn_version: Option<u64>,
    last_painted: u64,
}

impl Minimap {
    pub fn new(store: &TileStore) -> Self {
        let meta = store.meta();
        Self {
            image: RgbaImage::new(meta.width_tiles, meta.height_tiles),
            chunk_size: meta.chunk_size,
            drawn_version: None,
            last_painted: 0,
        }
    }

    /// Redraw whatever changed since the last refresh. Returns whether any
    /// pixel was repainted.
    pub fn refresh(&mut self, store: &TileStore, registry: &TileRegistry) -> bool {
        let version = store.version();
        if self.drawn_version == Some(version) {
            return false;
        }
        let changed = self.drawn_version.and_then(|drawn| store.changed_since(drawn));
        self.last_painted = match changed {
            Some(coords) => coords
                .into_iter()
                .map(|coord| self.paint_chunk(coord, store, registry))
                .sum(),
            None => self.paint_rect(0, 0, self.image.width(), self.image.height(), store, registry),
        };
        tracing::trace!(version, pixels = self.last_painted, "minimap refreshed");
        self.drawn_version = Some(version);
        true
    }

    fn paint_chunk(&mut self, coord: ChunkCoord, store: &TileStore, registry: &TileRegistry) -> u64 {
        let (Ok(cx), Ok(cy)) = (u32::try_from(coord.x), u32::try_from(coord.y)) else {
            return 0;
        };
        let x0 = cx.saturating_mul(self.chunk_size);
        let y0 = cy.saturating_mul(self.chunk_size);
        let x1 = x0.saturating_add(self.chunk_size).min(self.image.width());
        let y1 = y0.saturating_add(self.chunk_size).min(self.image.height());
        self.paint_rect(x0, y0, x1, y1, store, registry)
    }

    fn paint_rect(
        &mut self,
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
        store: &TileStore,
        registry: &TileRegistry,
    ) -> u64 {
        let mut painted = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                let id = store.get_tile_id(x as i32, y as i32);
                self.image.put_pixel(x, y, Rgba(registry.get(id).minimap_rgba));
                painted += 1;
            }
        }
        painted
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Pixels written by the most recent redraw.
    pub fn last_painted(&self) -> u64 {
        self.last_painted
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }
}
