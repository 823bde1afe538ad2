use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;

use driftlands_common::{ChunkCoord, TileCoord};
use lru::LruCache;
use serde::Deserialize;

use crate::meta::WorldMeta;
use crate::registry::TileId;
use crate::{FetchError, StreamError};

/// Streaming configuration: preload radius and cache bound.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Radius (in chunks) fetched around the focus every frame.
    pub preload_radius: i32,
    /// Upper bound on cached chunks. `None` keeps every chunk ever fetched.
    pub max_cached_chunks: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            preload_radius: 2,
            max_cached_chunks: Some(256),
        }
    }
}

/// Cumulative streaming counters for instrumentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub cached_chunks: usize,
    pub in_flight: usize,
    pub requested_total: u64,
    pub loaded_total: u64,
    pub failed_total: u64,
    pub evicted_total: u64,
}

/// One fixed-size block of tile-type ids, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainChunk {
    size: u32,
    tiles: Box<[u8]>,
}

impl TerrainChunk {
    /// Decode a chunk blob: one byte per tile, `size * size` bytes.
    pub fn decode(coord: ChunkCoord, size: u32, bytes: Vec<u8>) -> Result<Self, StreamError> {
        let expected = (size as usize) * (size as usize);
        if bytes.len() != expected {
            return Err(StreamError::ChunkSize {
                coord,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            size,
            tiles: bytes.into_boxed_slice(),
        })
    }

    pub fn get(&self, local_x: u32, local_y: u32) -> TileId {
        let idx = (local_y as usize) * (self.size as usize) + local_x as usize;
        self.tiles.get(idx).copied().map(TileId).unwrap_or(TileId::UNRESOLVED)
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

/// Change entries kept for incremental consumers; older readers repaint fully.
const CHANGE_LOG_LEN: usize = 512;

/// Client-side cache of streamed terrain chunks.
///
/// Lookups never block and never fail: anything not yet streamed, failed or
/// out of bounds reads as [`TileId::UNRESOLVED`]. Fetching is driven by
/// [`TileStore::preload_around_point`], which hands back the chunks the host
/// should request; the host reports each outcome through
/// [`TileStore::complete_fetch`], the only writer of a chunk slot.
pub struct TileStore {
    meta: WorldMeta,
    config: StreamConfig,
    chunks: LruCache<ChunkCoord, TerrainChunk>,
    in_flight: HashSet<ChunkCoord>,
    version: u64,
    /// `(version, coord)` for every chunk loaded or evicted, oldest first.
    changes: VecDeque<(u64, ChunkCoord)>,
    stats: StreamStats,
}

impl TileStore {
    pub fn new(meta: WorldMeta, config: StreamConfig) -> Result<Self, StreamError> {
        meta.validate()?;
        let chunks = match config.max_cached_chunks {
            Some(cap) => {
                let cap = cap.max(preload_area(&meta, config.preload_radius));
                LruCache::new(NonZeroUsize::new(cap).unwrap_or(NonZeroUsize::MIN))
            }
            None => LruCache::unbounded(),
        };
        Ok(Self {
            meta,
            config,
            chunks,
            in_flight: HashSet::new(),
            version: 0,
            changes: VecDeque::new(),
            stats: StreamStats::default(),
        })
    }

    pub fn meta(&self) -> &WorldMeta {
        &self.meta
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Tile-type id at a tile coordinate, or the impassable sentinel.
    pub fn get_tile_id(&self, tile_x: i32, tile_y: i32) -> TileId {
        let tile = TileCoord::new(tile_x, tile_y);
        if !self.meta.contains_tile(tile) {
            return TileId::UNRESOLVED;
        }
        let size = self.meta.chunk_size;
        let (lx, ly) = tile.local(size);
        self.chunks
            .peek(&tile.chunk(size))
            .map(|chunk| chunk.get(lx, ly))
            .unwrap_or(TileId::UNRESOLVED)
    }

    /// Request every missing chunk within `radius_chunks` of the chunk
    /// containing the given tile.
    ///
    /// Returns only the coordinates newly marked in flight; cached and
    /// already-requested chunks are skipped, so calling this every frame
    /// issues at most one fetch per chunk. Cached chunks in range are
    /// refreshed in the eviction order.
    pub fn preload_around_point(
        &mut self,
        tile_x: i32,
        tile_y: i32,
        radius_chunks: i32,
    ) -> Vec<ChunkCoord> {
        let _span = tracing::trace_span!("preload_around_point").entered();
        let radius = radius_chunks.clamp(0, max_radius(&self.meta));
        self.ensure_capacity(radius);

        let center = TileCoord::new(tile_x, tile_y).chunk(self.meta.chunk_size);
        let mut requests = Vec::new();
        for coord in center.square(radius) {
            if !self.meta.contains_chunk(coord) {
                continue;
            }
            if self.chunks.contains(&coord) {
                self.chunks.promote(&coord);
                continue;
            }
            if self.in_flight.insert(coord) {
                tracing::debug!(?coord, "requesting chunk");
                requests.push(coord);
            }
        }

        self.stats.requested_total += requests.len() as u64;
        self.stats.in_flight = self.in_flight.len();
        requests
    }

    /// Apply the outcome of a chunk fetch.
    ///
    /// Failures are logged and leave the slot empty; the coordinate leaves
    /// the in-flight set so a later preload can retry it.
    pub fn complete_fetch(
        &mut self,
        coord: ChunkCoord,
        result: Result<Vec<u8>, FetchError>,
    ) -> Result<(), StreamError> {
        if !self.in_flight.remove(&coord) {
            tracing::debug!(?coord, "ignoring completion for chunk that was not requested");
            return Err(StreamError::UnexpectedCompletion(coord));
        }
        self.stats.in_flight = self.in_flight.len();

        let outcome = result
            .map_err(|source| StreamError::Fetch { coord, source })
            .and_then(|bytes| TerrainChunk::decode(coord, self.meta.chunk_size, bytes));

        match outcome {
            Ok(chunk) => {
                self.version += 1;
                if let Some((evicted, _)) = self.chunks.push(coord, chunk) {
                    if evicted != coord {
                        tracing::debug!(?evicted, "evicted chunk");
                        self.stats.evicted_total += 1;
                        self.log_change(evicted);
                    }
                }
                self.log_change(coord);
                self.stats.loaded_total += 1;
                self.stats.cached_chunks = self.chunks.len();
                tracing::debug!(?coord, version = self.version, "chunk loaded");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(?coord, error = %err, "chunk fetch failed");
                self.stats.failed_total += 1;
                Err(err)
            }
        }
    }

    /// Increments on every successful chunk load.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Chunks loaded or evicted after `version`, or `None` when the change
    /// log no longer reaches back that far.
    pub fn changed_since(&self, version: u64) -> Option<Vec<ChunkCoord>> {
        if version >= self.version {
            return Some(Vec::new());
        }
        let oldest = self.changes.front().map(|(v, _)| *v)?;
        if oldest > version + 1 {
            return None;
        }
        let mut seen = HashSet::new();
        Some(
            self.changes
                .iter()
                .filter(|(v, _)| *v > version)
                .map(|(_, coord)| *coord)
                .filter(|coord| seen.insert(*coord))
                .collect(),
        )
    }

    pub fn is_cached(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains(&coord)
    }

    pub fn is_in_flight(&self, coord: ChunkCoord) -> bool {
        self.in_flight.contains(&coord)
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Never let the bound drop below the preload square, or the chunks
    /// around the focus would evict each other.
    fn ensure_capacity(&mut self, radius: i32) {
        if self.config.max_cached_chunks.is_none() {
            return;
        }
        let needed = preload_area(&self.meta, radius);
        if self.chunks.cap().get() < needed {
            if let Some(cap) = NonZeroUsize::new(needed) {
                tracing::warn!(needed, "raising chunk cache bound to cover preload radius");
                self.chunks.resize(cap);
            }
        }
    }

    fn log_change(&mut self, coord: ChunkCoord) {
        self.changes.push_back((self.version, coord));
        while self.changes.len() > CHANGE_LOG_LEN {
            self.changes.pop_front();
        }
    }
}

/// Largest radius that can still reach a chunk of the world from inside it.
fn max_radius(meta: &WorldMeta) -> i32 {
    i32::try_from(meta.chunks_x.max(meta.chunks_y)).unwrap_or(i32::MAX)
}

/// Chunks a preload of `radius` can hold at once, capped by the world size.
fn preload_area(meta: &WorldMeta, radius: i32) -> usize {
    let side = (radius.max(0) as usize).saturating_mul(2).saturating_add(1);
    let world = (meta.chunks_x as usize).saturating_mul(meta.chunks_y as usize).max(1);
    side.saturating_mul(side).min(world)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> WorldMeta {
        WorldMeta::for_tiles(128, 128, 16)
    }

    fn chunk_bytes(fill: u8) -> Vec<u8> {
        vec![fill; 16 * 16]
    }

    #[test]
    fn out_of_bounds_returns_sentinel() {
        let mut store = TileStore::new(meta(), StreamConfig::default()).unwrap();
        for coord in store.preload_around_point(0, 0, 8) {
            store.complete_fetch(coord, Ok(chunk_bytes(0))).unwrap();
        }
        assert_eq!(store.get_tile_id(-1, 0), TileId::UNRESOLVED);
        assert_eq!(store.get_tile_id(0, -1), TileId::UNRESOLVED);
        assert_eq!(store.get_tile_id(128, 5), TileId::UNRESOLVED);
        assert_eq!(store.get_tile_id(5, 128), TileId::UNRESOLVED);
        assert_eq!(store.get_tile_id(127, 127), TileId::GRASS);
    }

    #[test]
    fn unfetched_chunk_returns_sentinel() {
        let store = TileStore::new(meta(), StreamConfig::default()).unwrap();
        assert_eq!(store.get_tile_id(3, 3), TileId::UNRESOLVED);
    }

    #[test]
    fn preload_is_idempotent_while_in_flight() {
        let mut store = TileStore::new(meta(), StreamConfig::default()).unwrap();
        let first = store.preload_around_point(64, 64, 1);
        assert_eq!(first.len(), 9);
        let second = store.preload_around_point(64, 64, 1);
        assert!(second.is_empty());
        let wider = store.preload_around_point(64, 64, 2);
        assert_eq!(wider.len(), 25 - 9);
    }

    #[test]
    fn preload_skips_out_of_bounds_chunks() {
        let mut store = TileStore::new(meta(), StreamConfig::default()).unwrap();
        let requests = store.preload_around_point(0, 0, 1);
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|c| c.x >= 0 && c.y >= 0));
    }

    #[test]
    fn successful_fetch_bumps_version() {
        let mut store = TileStore::new(meta(), StreamConfig::default()).unwrap();
        let requests = store.preload_around_point(0, 0, 0);
        assert_eq!(store.version(), 0);
        store.complete_fetch(requests[0], Ok(chunk_bytes(1))).unwrap();
        assert_eq!(store.version(), 1);
        assert_eq!(store.get_tile_id(4, 4), TileId::WATER);
        assert!(store.preload_around_point(0, 0, 0).is_empty());
    }

    #[test]
    fn failed_fetch_leaves_slot_empty_and_allows_retry() {
        let mut store = TileStore::new(meta(), StreamConfig::default()).unwrap();
        let coord = store.preload_around_point(0, 0, 0)[0];
        let err = store
            .complete_fetch(coord, Err(FetchError::Status(503)))
            .unwrap_err();
        assert!(matches!(err, StreamError::Fetch { .. }));
        assert_eq!(store.get_tile_id(0, 0), TileId::UNRESOLVED);
        assert_eq!(store.version(), 0);
        assert_eq!(store.stats().failed_total, 1);
        assert_eq!(store.preload_around_point(0, 0, 0), vec![coord]);
    }

    #[test]
    fn wrong_length_chunk_is_rejected() {
        let mut store = TileStore::new(meta(), StreamConfig::default()).unwrap();
        let coord = store.preload_around_point(0, 0, 0)[0];
        let err = store.complete_fetch(coord, Ok(vec![0; 10])).unwrap_err();
        assert!(matches!(err, StreamError::ChunkSize { actual: 10, .. }));
        assert_eq!(store.get_tile_id(0, 0), TileId::UNRESOLVED);
    }

    #[test]
    fn unrequested_completion_is_ignored() {
        let mut store = TileStore::new(meta(), StreamConfig::default()).unwrap();
        let err = store
            .complete_fetch(ChunkCoord::new(1, 1), Ok(chunk_bytes(0)))
            .unwrap_err();
        assert!(matches!(err, StreamError::UnexpectedCompletion(_)));
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn bounded_cache_evicts_chunks_far_from_focus() {
        let config = StreamConfig {
            preload_radius: 0,
            max_cached_chunks: Some(2),
        };
        let mut store = TileStore::new(meta(), config).unwrap();
        for (x, y) in [(0, 0), (16, 0), (32, 0)] {
            let coord = store.preload_around_point(x, y, 0)[0];
            store.complete_fetch(coord, Ok(chunk_bytes(2))).unwrap();
        }
        assert!(!store.is_cached(ChunkCoord::new(0, 0)));
        assert!(store.is_cached(ChunkCoord::new(1, 0)));
        assert!(store.is_cached(ChunkCoord::new(2, 0)));
        assert_eq!(store.stats().evicted_total, 1);
    }

    #[test]
    fn touched_chunks_survive_eviction() {
        let config = StreamConfig {
            preload_radius: 0,
            max_cached_chunks: Some(2),
        };
        let mut store = TileStore::new(meta(), config).unwrap();
        let a = store.preload_around_point(0, 0, 0)[0];
        store.complete_fetch(a, Ok(chunk_bytes(0))).unwrap();
        let b = store.preload_around_point(16, 0, 0)[0];
        store.complete_fetch(b, Ok(chunk_bytes(0))).unwrap();
        // Focus returns to chunk a before a third chunk arrives.
        assert!(store.preload_around_point(0, 0, 0).is_empty());
        let c = store.preload_around_point(32, 0, 0)[0];
        store.complete_fetch(c, Ok(chunk_bytes(0))).unwrap();
        assert!(store.is_cached(a));
        assert!(!store.is_cached(b));
    }

    #[test]
    fn capacity_grows_to_cover_preload_square() {
        let config = StreamConfig {
            preload_radius: 1,
            max_cached_chunks: Some(1),
        };
        let mut store = TileStore::new(meta(), config).unwrap();
        let requests = store.preload_around_point(40, 40, 1);
        for coord in &requests {
            store.complete_fetch(*coord, Ok(chunk_bytes(0))).unwrap();
        }
        assert!(requests.iter().all(|c| store.is_cached(*c)));
    }

    #[test]
    fn unbounded_cache_never_evicts() {
        let config = StreamConfig {
            preload_radius: 0,
            max_cached_chunks: None,
        };
        let mut store = TileStore::new(meta(), config).unwrap();
        let requests = store.preload_around_point(64, 64, 8);
        for coord in &requests {
            store.complete_fetch(*coord, Ok(chunk_bytes(3))).unwrap();
        }
        assert_eq!(store.stats().cached_chunks, 64);
        assert_eq!(store.stats().evicted_total, 0);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let meta = WorldMeta {
            width_tiles: 16,
            height_tiles: 16,
            chunk_size: 0,
            chunks_x: 1,
            chunks_y: 1,
        };
        let err = TileStore::new(meta, StreamConfig::default()).err();
        assert!(matches!(err, Some(StreamError::InvalidMeta(_))));
    }

    #[test]
    fn huge_radius_is_bounded_by_world() {
        let config = StreamConfig {
            preload_radius: i32::MAX,
            max_cached_chunks: Some(4),
        };
        let mut store = TileStore::new(meta(), config).unwrap();
        let requests = store.preload_around_point(64, 64, i32::MAX);
        assert_eq!(requests.len(), 64);
        assert!(store.preload_around_point(i32::MAX, i32::MIN, i32::MAX).is_empty());
    }

    #[test]
    fn change_log_reports_loads_and_evictions() {
        let config = StreamConfig {
            preload_radius: 0,
            max_cached_chunks: Some(1),
        };
        let mut store = TileStore::new(meta(), config).unwrap();
        assert_eq!(store.changed_since(0), Some(vec![]));

        let a = store.preload_around_point(0, 0, 0)[0];
        store.complete_fetch(a, Ok(chunk_bytes(0))).unwrap();
        assert_eq!(store.changed_since(0), Some(vec![a]));

        let b = store.preload_around_point(16, 0, 0)[0];
        store.complete_fetch(b, Ok(chunk_bytes(0))).unwrap();
        assert_eq!(store.changed_since(1), Some(vec![a, b]));
        assert_eq!(store.changed_since(2), Some(vec![]));
    }

    #[test]
    fn change_log_forgets_old_versions() {
        let config = StreamConfig {
            preload_radius: 0,
            max_cached_chunks: None,
        };
        let big = WorldMeta::for_tiles(1024, 1024, 16);
        let mut store = TileStore::new(big, config).unwrap();
        for x in 0..64 {
            for y in 0..9 {
                let coord = store.preload_around_point(x * 16, y * 16, 0)[0];
                store.complete_fetch(coord, Ok(chunk_bytes(0))).unwrap();
            }
        }
        assert_eq!(store.version(), 576);
        assert!(store.changed_since(0).is_none());
        assert_eq!(store.changed_since(575).map(|c| c.len()), Some(1));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn lookups_outside_world_are_always_sentinel(x in -1000i32..1000, y in -1000i32..1000) {
                let mut store = TileStore::new(meta(), StreamConfig { preload_radius: 0, max_cached_chunks: None }).unwrap();
                for coord in store.preload_around_point(64, 64, 8) {
                    store.complete_fetch(coord, Ok(chunk_bytes(0))).unwrap();
                }
                let inside = (0..128).contains(&x) && (0..128).contains(&y);
                let id = store.get_tile_id(x, y);
                prop_assert_eq!(id == TileId::UNRESOLVED, !inside);
            }

            #[test]
            fn never_two_requests_for_one_chunk(points in proptest::collection::vec((0i32..128, 0i32..128, 0i32..3), 1..20)) {
                let mut store = TileStore::new(meta(), StreamConfig::default()).unwrap();
                let mut seen = HashSet::new();
                for (x, y, r) in points {
                    for coord in store.preload_around_point(x, y, r) {
                        prop_assert!(seen.insert(coord));
                    }
                }
            }
        }
    }
}
