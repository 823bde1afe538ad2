use driftlands_common::{ChunkCoord, TileCoord};
use serde::{Deserialize, Serialize};

use crate::StreamError;

/// World dimensions, fetched once from the meta endpoint and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMeta {
    pub width_tiles: u32,
    pub height_tiles: u32,
    pub chunk_size: u32,
    pub chunks_x: u32,
    pub chunks_y: u32,
}

impl WorldMeta {
    /// Build a meta block for a tile grid, deriving the chunk grid.
    pub fn for_tiles(width_tiles: u32, height_tiles: u32, chunk_size: u32) -> Self {
        let size = chunk_size.max(1);
        Self {
            width_tiles,
            height_tiles,
            chunk_size: size,
            chunks_x: width_tiles.div_ceil(size),
            chunks_y: height_tiles.div_ceil(size),
        }
    }

    /// Parse and validate the meta endpoint's JSON body.
    pub fn from_json(body: &str) -> Result<Self, StreamError> {
        let meta: WorldMeta = serde_json::from_str(body)?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.chunk_size == 0 {
            return Err(StreamError::InvalidMeta("chunk_size must be positive".into()));
        }
        if (self.chunks_x as u64) * (self.chunk_size as u64) < self.width_tiles as u64
            || (self.chunks_y as u64) * (self.chunk_size as u64) < self.height_tiles as u64
        {
            return Err(StreamError::InvalidMeta(format!(
                "chunk grid {}x{} of size {} does not cover {}x{} tiles",
                self.chunks_x, self.chunks_y, self.chunk_size, self.width_tiles, self.height_tiles
            )));
        }
        Ok(())
    }

    pub fn contains_tile(&self, tile: TileCoord) -> bool {
        tile.x >= 0
            && tile.y >= 0
            && (tile.x as u32) < self.width_tiles
            && (tile.y as u32) < self.height_tiles
    }

    pub fn contains_chunk(&self, chunk: ChunkCoord) -> bool {
        chunk.x >= 0
            && chunk.y >= 0
            && (chunk.x as u32) < self.chunks_x
            && (chunk.y as u32) < self.chunks_y
    }

    /// Bytes expected in one chunk blob.
    pub fn chunk_len(&self) -> usize {
        (self.chunk_size as usize) * (self.chunk_size as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_meta_json() {
        let meta = WorldMeta::from_json(
            r#"{"width_tiles":100,"height_tiles":64,"chunk_size":32,"chunks_x":4,"chunks_y":2}"#,
        )
        .unwrap();
        assert_eq!(meta.chunk_len(), 1024);
        assert!(meta.contains_tile(TileCoord::new(99, 63)));
        assert!(!meta.contains_tile(TileCoord::new(100, 0)));
        assert!(!meta.contains_tile(TileCoord::new(-1, 0)));
    }

    #[test]
    fn reject_uncovered_grid() {
        let err = WorldMeta::from_json(
            r#"{"width_tiles":100,"height_tiles":64,"chunk_size":32,"chunks_x":3,"chunks_y":2}"#,
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::InvalidMeta(_)));
    }

    #[test]
    fn reject_zero_chunk_size() {
        let meta = WorldMeta {
            width_tiles: 1,
            height_tiles: 1,
            chunk_size: 0,
            chunks_x: 1,
            chunks_y: 1,
        };
        assert!(meta.validate().is_err());
    }

    #[test]
    fn for_tiles_rounds_chunk_grid_up() {
        let meta = WorldMeta::for_tiles(65, 32, 32);
        assert_eq!((meta.chunks_x, meta.chunks_y), (3, 1));
        assert!(meta.contains_chunk(ChunkCoord::new(2, 0)));
        assert!(!meta.contains_chunk(ChunkCoord::new(3, 0)));
    }
}
