//! Nebula clouds: baked once offscreen, then only moved and faded.

use driftlands_common::{Rgba, Viewport, hash2d, splitmix64, unit_f32};
use driftlands_render::{Blend, DrawList, ImageDraw, ImageRef, Rect};
use glam::Vec2;
use image::{RgbaImage, imageops};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Deserialize;

use crate::BackdropError;
use crate::mask::{MaskCache, MaskKey, smoothstep};
use crate::osc::Oscillator;

/// Integer rotation matrices `[[a, -b], [b, a]]`, one per octave. Integer
/// entries map the unit torus onto itself, so every octave stays periodic.
const OCTAVE_ROTATIONS: [(i32, i32); 6] = [(1, 0), (2, 1), (1, -2), (3, 1), (-1, 3), (2, -3)];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NebulaConfig {
    /// Bake edge length in pixels.
    pub size: u32,
    pub octaves: u32,
    /// Lattice cells per unit for the first octave.
    pub base_period: u32,
    pub puffs: u32,
    pub blur_sigma: f32,
    pub contrast: f32,
    /// Color multiplier applied after the contrast pass.
    pub darken: f32,
    pub palette: Vec<String>,
    /// Clouds placed per bake.
    pub clouds: usize,
    /// Toroidal extent of the cloud layer, in screen pixels.
    pub extent: f32,
    pub parallax: f32,
}

impl Default for NebulaConfig {
    fn default() -> Self {
        Self {
            size: 256,
            octaves: 5,
            base_period: 4,
            puffs: 6,
            blur_sigma: 3.0,
            contrast: 1.35,
            darken: 0.8,
            palette: vec!["#5a3d8a".into(), "#2f5f8f".into(), "#7a3458".into()],
            clouds: 3,
            extent: 2400.0,
            parallax: 0.03,
        }
    }
}

impl NebulaConfig {
    pub fn validate(&self) -> Result<(), BackdropError> {
        if self.size == 0 || self.size > 2048 {
            return Err(BackdropError::InvalidSize {
                width: self.size,
                height: self.size,
            });
        }
        for color in &self.palette {
            if Rgba::from_hex(color).is_none() {
                return Err(BackdropError::InvalidColor(color.clone()));
            }
        }
        if self.palette.is_empty() {
            return Err(BackdropError::InvalidColor("empty palette".into()));
        }
        Ok(())
    }
}

/// Periodic value noise on the unit torus with `period` lattice cells.
pub fn value_noise(u: f32, v: f32, period: u32, seed: u64) -> f32 {
    let period = period.max(1) as i32;
    let x = u.rem_euclid(1.0) * period as f32;
    let y = v.rem_euclid(1.0) * period as f32;
    let (x0, y0) = (x.floor() as i32, y.floor() as i32);
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);
    let corner = |cx: i32, cy: i32| unit_f32(hash2d(cx.rem_euclid(period), cy.rem_euclid(period), seed));
    let (sx, sy) = (smoothstep(0.0, 1.0, fx), smoothstep(0.0, 1.0, fy));
    let top = corner(x0, y0) + (corner(x0 + 1, y0) - corner(x0, y0)) * sx;
    let bottom = corner(x0, y0 + 1) + (corner(x0 + 1, y0 + 1) - corner(x0, y0 + 1)) * sx;
    top + (bottom - top) * sy
}

/// Tileable fractal noise in `[0, 1]`.
pub fn fractal_noise(u: f32, v: f32, octaves: u32, base_period: u32, seed: u64) -> f32 {
    let mut sum = 0.0;
    let mut norm = 0.0;
    let mut amp = 1.0;
    for octave in 0..octaves.max(1) {
        let (a, b) = OCTAVE_ROTATIONS[octave as usize % OCTAVE_ROTATIONS.len()];
        let (a, b) = (a as f32, b as f32);
        let ru = a * u - b * v;
        let rv = b * u + a * v;
        let period = base_period.max(1) << octave.min(16);
        sum += amp * value_noise(ru, rv, period, splitmix64(seed ^ octave as u64));
        norm += amp;
        amp *= 0.5;
    }
    sum / norm
}

/// A finished cloud bake.
#[derive(Debug, Clone)]
pub struct NebulaBake {
    pub key: String,
    pub image: RgbaImage,
}

impl NebulaBake {
    /// Write the bake as a PNG.
    pub fn save_png(&self, path: impl AsRef<std::path::Path>) -> Result<(), BackdropError> {
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Bakes nebula clouds into RGBA images.
#[derive(Debug, Clone, Default)]
pub struct NebulaBaker {
    config: NebulaConfig,
}

impl NebulaBaker {
    pub fn new(config: NebulaConfig) -> Result<Self, BackdropError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NebulaConfig {
        &self.config
    }

    /// Bake one cloud. Masks come from the injected cache.
    pub fn bake(&self, seed: u64, masks: &mut MaskCache) -> Result<NebulaBake, BackdropError> {
        let _span = tracing::info_span!("nebula_bake", seed).entered();
        let cfg = &self.config;
        let size = cfg.size;
        let mut rng = Pcg32::seed_from_u64(splitmix64(seed ^ 0x6e65_6275));

        let hex = &cfg.palette[rng.random_range(0..cfg.palette.len())];
        let tint = Rgba::from_hex(hex).ok_or_else(|| BackdropError::InvalidColor(hex.clone()))?;
        let mask = masks.get_or_generate(MaskKey {
            seed,
            width: size,
            height: size,
        });

        struct Puff {
            center: Vec2,
            radius: f32,
            offset: Vec2,
            scale: f32,
        }
        let puffs: Vec<Puff> = (0..cfg.puffs.max(1))
            .map(|_| Puff {
                center: Vec2::new(rng.random_range(0.25..0.75), rng.random_range(0.25..0.75)),
                radius: rng.random_range(0.2..0.4),
                offset: Vec2::new(rng.random(), rng.random()),
                scale: rng.random_range(0.6..1.4),
            })
            .collect();

        let mut img = RgbaImage::new(size, size);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let p = Vec2::new((x as f32 + 0.5) / size as f32, (y as f32 + 0.5) / size as f32);
            let mut density = 0.0f32;
            for puff in &puffs {
                let falloff = 1.0 - smoothstep(0.0, puff.radius, p.distance(puff.center));
                if falloff <= 0.0 {
                    continue;
                }
                let q = p * puff.scale + puff.offset;
                density += falloff * fractal_noise(q.x, q.y, cfg.octaves, cfg.base_period, seed);
            }
            let alpha = (density.min(1.0) * mask.get(x, y)).clamp(0.0, 1.0);
            let [r, g, b, _] = tint.to_rgba8();
            *px = image::Rgba([r, g, b, (alpha * 255.0).round() as u8]);
        }

        let mut img = imageops::blur(&img, cfg.blur_sigma.max(0.1));
        for px in img.pixels_mut() {
            let a = px.0[3] as f32 / 255.0;
            let a = ((a - 0.5) * cfg.contrast + 0.5).clamp(0.0, 1.0);
            px.0[3] = (a * 255.0).round() as u8;
            for c in &mut px.0[..3] {
                *c = (*c as f32 * cfg.darken).clamp(0.0, 255.0) as u8;
            }
        }

        tracing::debug!(seed, size, "nebula baked");
        Ok(NebulaBake {
            key: format!("nebula-{seed:016x}"),
            image: img,
        })
    }
}

/// One placed cloud referencing a bake by key.
#[derive(Debug, Clone, PartialEq)]
pub struct NebulaCloud {
    pub key: String,
    /// Position inside the layer's toroidal tile.
    pub pos: Vec2,
    pub scale: f32,
    pub alpha: f32,
    pub breathe: Oscillator,
    pub jitter: Oscillator,
    pub jitter_amp: f32,
}

/// Render-time placement of baked clouds. Never re-bakes.
#[derive(Debug, Clone, PartialEq)]
pub struct NebulaLayer {
    clouds: Vec<NebulaCloud>,
    size: f32,
    extent: f32,
    parallax: f32,
}

impl NebulaLayer {
    pub fn place(seed: u64, bake_keys: &[String], config: &NebulaConfig) -> Self {
        let mut rng = Pcg32::seed_from_u64(splitmix64(seed ^ 0x636c_6f75));
        let extent = config.extent.max(1.0);
        let clouds = bake_keys
            .iter()
            .flat_map(|key| std::iter::repeat_n(key, config.clouds.max(1)))
            .map(|key| NebulaCloud {
                key: key.clone(),
                pos: Vec2::new(rng.random_range(0.0..extent), rng.random_range(0.0..extent)),
                scale: rng.random_range(1.5..3.0),
                alpha: rng.random_range(0.35..0.6),
                breathe: Oscillator::random(&mut rng, 0.02..0.06, 0.35),
                jitter: Oscillator::random(&mut rng, 0.01..0.03, 1.0),
                jitter_amp: rng.random_range(4.0..12.0),
            })
            .collect();
        Self {
            clouds,
            size: config.size as f32,
            extent,
            parallax: config.parallax,
        }
    }

    pub fn clouds(&self) -> &[NebulaCloud] {
        &self.clouds
    }

    pub fn draw(&self, view: &Viewport, time_s: f32, out: &mut DrawList) {
        for cloud in &self.clouds {
            let side = self.size * cloud.scale;
            let jitter = Vec2::new(cloud.jitter.wave(time_s), cloud.jitter.wave(time_s + 7.3)) * cloud.jitter_amp;
            let p = cloud.pos - view.center * self.parallax + jitter;
            // Wrap with a margin so a cloud slides in instead of popping.
            let period = self.extent + side;
            let min = Vec2::new(p.x.rem_euclid(period), p.y.rem_euclid(period)) - Vec2::splat(side);
            let dest = Rect::from_min_size(min, Vec2::splat(side));
            if !dest.intersects(&Rect::from_min_size(Vec2::ZERO, view.size)) {
                continue;
            }
            let mut draw = ImageDraw::new(ImageRef::Baked(cloud.key.clone()), dest);
            draw.alpha = cloud.alpha * cloud.breathe.value(time_s);
            draw.blend = Blend::Additive;
            out.image(draw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> NebulaConfig {
        NebulaConfig {
            size: 48,
            octaves: 3,
            puffs: 3,
            ..NebulaConfig::default()
        }
    }

    #[test]
    fn noise_is_tileable() {
        for octaves in 1..5 {
            let a = fractal_noise(0.13, 0.77, octaves, 4, 9);
            let b = fractal_noise(1.13, 0.77, octaves, 4, 9);
            let c = fractal_noise(0.13, -0.23, octaves, 4, 9);
            assert!((a - b).abs() < 1e-3, "octaves={octaves}");
            assert!((a - c).abs() < 1e-3, "octaves={octaves}");
            assert!((0.0..=1.0).contains(&a));
        }
    }

    #[test]
    fn bake_is_reproducible() {
        let baker = NebulaBaker::new(small_config()).unwrap();
        let mut masks = MaskCache::default();
        let a = baker.bake(21, &mut masks).unwrap();
        let b = baker.bake(21, &mut masks).unwrap();
        assert_eq!(a.key, b.key);
        assert_eq!(a.image.as_raw(), b.image.as_raw());
        assert_eq!(a.image.dimensions(), (48, 48));
        // second bake reused the cached mask
        assert_eq!(masks.generated(), 1);
    }

    #[test]
    fn bake_has_soft_visible_core() {
        let baker = NebulaBaker::new(small_config()).unwrap();
        let bake = baker.bake(3, &mut MaskCache::default()).unwrap();
        assert_eq!(bake.image.get_pixel(0, 0).0[3], 0);
        assert!(bake.image.pixels().any(|p| p.0[3] > 0));
    }

    #[test]
    fn bake_saves_as_png() {
        let baker = NebulaBaker::new(small_config()).unwrap();
        let bake = baker.bake(5, &mut MaskCache::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.png");
        bake.save_png(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");

        let missing = dir.path().join("no-such-dir").join("cloud.png");
        assert!(matches!(bake.save_png(&missing), Err(BackdropError::Image(_))));
    }

    #[test]
    fn invalid_config_rejected() {
        let bad = NebulaConfig {
            size: 0,
            ..NebulaConfig::default()
        };
        assert!(matches!(NebulaBaker::new(bad), Err(BackdropError::InvalidSize { .. })));
        let bad = NebulaConfig {
            palette: vec!["purple".into()],
            ..NebulaConfig::default()
        };
        assert!(matches!(NebulaBaker::new(bad), Err(BackdropError::InvalidColor(_))));
    }

    #[test]
    fn layer_breathes_without_rebaking() {
        let config = NebulaConfig {
            extent: 400.0,
            ..small_config()
        };
        let layer = NebulaLayer::place(4, &["nebula-a".to_string()], &config);
        assert_eq!(layer.clouds().len(), config.clouds);

        let view = Viewport::new(Vec2::ZERO, Vec2::new(2000.0, 2000.0), 1.0);
        let alphas = |t: f32| {
            let mut list = DrawList::new();
            layer.draw(&view, t, &mut list);
            list.iter()
                .filter_map(|c| match c {
                    driftlands_render::DrawCommand::Image(d) => Some(d.alpha),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        let early = alphas(0.0);
        let later = alphas(9.0);
        assert!(!early.is_empty());
        assert_eq!(early.len(), later.len());
        assert_ne!(early, later);
    }
}
