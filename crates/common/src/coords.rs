use serde::{Deserialize, Serialize};

/// A tile coordinate on the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing this tile for the given chunk size.
    pub fn chunk(&self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i32;
        ChunkCoord {
            x: self.x.div_euclid(size),
            y: self.y.div_euclid(size),
        }
    }

    /// Offset of this tile inside its chunk.
    pub fn local(&self, chunk_size: u32) -> (u32, u32) {
        let size = chunk_size as i32;
        (
            self.x.rem_euclid(size) as u32,
            self.y.rem_euclid(size) as u32,
        )
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A chunk coordinate: the unit of terrain transfer and caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance in chunks.
    pub fn distance(&self, other: ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// All chunks within a square radius, row-major from the top-left.
    pub fn square(&self, radius: i32) -> impl Iterator<Item = ChunkCoord> + use<> {
        let center = *self;
        (-radius..=radius).flat_map(move |dy| {
            (-radius..=radius)
                .map(move |dx| ChunkCoord::new(center.x.saturating_add(dx), center.y.saturating_add(dy)))
        })
    }
}
