use std::num::NonZeroUsize;
use std::sync::Arc;

use driftlands_common::splitmix64;
use glam::Vec2;
use lru::LruCache;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Feathered alpha mask: a union of radial blobs with holes punched out.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl AlphaMask {
    pub fn generate(seed: u64, width: u32, height: u32) -> Self {
        let mut rng = Pcg32::seed_from_u64(splitmix64(seed ^ 0x6d61_736b));
        let blobs: Vec<(Vec2, f32)> = (0..rng.random_range(4..8))
            .map(|_| {
                let c = Vec2::new(rng.random_range(0.3..0.7), rng.random_range(0.3..0.7));
                (c, rng.random_range(0.15..0.3))
            })
            .collect();
        let holes: Vec<(Vec2, f32)> = (0..rng.random_range(1..4))
            .map(|_| {
                let c = Vec2::new(rng.random_range(0.25..0.75), rng.random_range(0.25..0.75));
                (c, rng.random_range(0.04..0.1))
            })
            .collect();

        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let p = Vec2::new((x as f32 + 0.5) / width as f32, (y as f32 + 0.5) / height as f32);
                let fill = blobs
                    .iter()
                    .map(|(c, r)| 1.0 - smoothstep(r * 0.4, *r, p.distance(*c)))
                    .fold(0.0f32, f32::max);
                let cut = holes
                    .iter()
                    .map(|(c, r)| 1.0 - smoothstep(r * 0.3, *r, p.distance(*c)))
                    .fold(0.0f32, f32::max);
                data.push((fill * (1.0 - cut)).clamp(0.0, 1.0));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.data[(y * self.width + x) as usize]
    }
}

pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0).max(f32::EPSILON)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskKey {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
}

/// Cache of generated alpha masks, owned by whoever runs the bakes.
#[derive(Debug)]
pub struct MaskCache {
    masks: LruCache<MaskKey, Arc<AlphaMask>>,
    generated: u64,
}

impl MaskCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            masks: LruCache::new(capacity),
            generated: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            masks: LruCache::unbounded(),
            generated: 0,
        }
    }

    /// Cached mask for `key`, generating it on first use.
    pub fn get_or_generate(&mut self, key: MaskKey) -> Arc<AlphaMask> {
        if let Some(mask) = self.masks.get(&key) {
            return Arc::clone(mask);
        }
        let mask = Arc::new(AlphaMask::generate(key.seed, key.width, key.height));
        self.masks.put(key, Arc::clone(&mask));
        self.generated += 1;
        tracing::debug!(?key, "alpha mask generated");
        mask
    }

    /// Number of masks generated so far (cache misses).
    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

impl Default for MaskCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(16).unwrap_or(NonZeroUsize::MIN))
    }
}
