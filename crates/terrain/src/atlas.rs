use driftlands_render::Rect;
use serde::Deserialize;

/// Grid layout of the terrain sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AtlasLayout {
    /// Edge length of one tile in atlas pixels.
    pub tile_size: u32,
    /// Pixels between neighbouring tiles.
    pub gap: u32,
    /// Pixels around the whole grid.
    pub margin: u32,
    pub columns: u32,
}

impl Default for AtlasLayout {
    fn default() -> Self {
        Self {
            tile_size: 32,
            gap: 1,
            margin: 1,
            columns: 16,
        }
    }
}

/// Source rectangle of one atlas tile, in atlas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl AtlasRegion {
    pub fn to_rect(self) -> Rect {
        Rect::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }
}

impl AtlasLayout {
    /// Region of the tile at `index`, counted row-major from the top left.
    pub fn region(&self, index: u32) -> AtlasRegion {
        let columns = self.columns.max(1);
        let (row, col) = (index / columns, index % columns);
        let stride = self.tile_size + self.gap;
        AtlasRegion {
            x: self.margin + col * stride,
            y: self.margin + row * stride,
            w: self.tile_size,
            h: self.tile_size,
        }
    }
}
