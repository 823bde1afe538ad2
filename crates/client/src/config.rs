use std::path::{Path, PathBuf};

use driftlands_backdrop::BackdropConfig;
use driftlands_input::InputConfig;
use driftlands_render::SpriteConfig;
use driftlands_replica::ReplicaConfig;
use driftlands_stream::StreamConfig;
use driftlands_terrain::AtlasLayout;
use serde::Deserialize;

use crate::deferred::DeferredConfig;

/// Errors from loading or validating a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Frame scheduling and camera tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Upper bound on one frame's delta time, in seconds.
    pub max_dt: f32,
    pub camera_half_life_ms: f32,
    /// CSS pixels per world unit.
    pub view_scale: f32,
    /// Frames kept by the frame time ring.
    pub stats_window: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_dt: 0.1,
            camera_half_life_ms: 120.0,
            view_scale: 1.0,
            stats_window: 120,
        }
    }
}

/// Capacities of the injected cache services. `None` is unbounded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub images: Option<usize>,
    pub masks: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            images: Some(512),
            masks: Some(16),
        }
    }
}

/// Top-level client configuration, loadable from YAML.
///
/// Every section is optional; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// World seed shared by every procedural generator.
    pub seed: u64,
    /// Nebula clouds baked by the deferred init.
    pub nebula_bakes: u32,
    pub frame: FrameConfig,
    pub boot: DeferredConfig,
    pub caches: CacheConfig,
    pub stream: StreamConfig,
    pub atlas: AtlasLayout,
    pub backdrop: BackdropConfig,
    pub sprites: SpriteConfig,
    pub replica: ReplicaConfig,
    pub input: InputConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            nebula_bakes: 2,
            frame: FrameConfig::default(),
            boot: DeferredConfig::default(),
            caches: CacheConfig::default(),
            stream: StreamConfig::default(),
            atlas: AtlasLayout::default(),
            backdrop: BackdropConfig::default(),
            sprites: SpriteConfig::default(),
            replica: ReplicaConfig::default(),
            input: InputConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading client config");
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if !positive(self.frame.max_dt as f64) {
            return invalid("frame.max_dt must be positive");
        }
        if !positive(self.frame.view_scale as f64) {
            return invalid("frame.view_scale must be positive");
        }
        if self.frame.camera_half_life_ms < 0.0 {
            return invalid("frame.camera_half_life_ms must not be negative");
        }
        if !positive(self.boot.watchdog_ms) {
            return invalid("boot.watchdog_ms must be positive");
        }
        if !positive(self.input.min_interval_ms) {
            return invalid("input.min_interval_ms must be positive");
        }
        if self.stream.preload_radius < 0 {
            return invalid("stream.preload_radius must not be negative");
        }
        if self.stream.max_cached_chunks == Some(0) {
            return invalid("stream.max_cached_chunks must be positive");
        }
        if self.caches.images == Some(0) || self.caches.masks == Some(0) {
            return invalid("cache capacities must be positive");
        }
        if self.atlas.tile_size == 0 || self.atlas.columns == 0 {
            return invalid("atlas.tile_size and atlas.columns must be positive");
        }
        let interp = &self.replica.interpolation;
        if interp.interp_delay_ms < 0.0 || interp.max_extrapolation_ms < 0.0 {
            return invalid("interpolation delays must not be negative");
        }
        if interp.history_ms <= interp.interp_delay_ms {
            return invalid("replica.interpolation.history_ms must exceed interp_delay_ms");
        }
        if !positive(self.replica.prediction.max_speed as f64) {
            return invalid("replica.prediction.max_speed must be positive");
        }
        self.backdrop
            .nebula
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("backdrop.nebula: {err}")))?;
        Ok(())
    }
}

/// False for zero, negatives and NaN.
fn positive(value: f64) -> bool {
    value > 0.0
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        ClientConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = ClientConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = ClientConfig::from_yaml_str(
            "seed: 99\nstream:\n  preload_radius: 3\ninput:\n  min_interval_ms: 50\n",
        )
        .unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.stream.preload_radius, 3);
        assert_eq!(config.stream.max_cached_chunks, Some(256));
        assert_eq!(config.input.min_interval_ms, 50.0);
        assert_eq!(config.frame, FrameConfig::default());
    }

    #[test]
    fn rejects_nonsense() {
        let err = ClientConfig::from_yaml_str("input:\n  min_interval_ms: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ClientConfig::from_yaml_str("stream:\n  max_cached_chunks: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_cached_chunks"));

        let err = ClientConfig::from_yaml_str("backdrop:\n  nebula:\n    palette: ['nope']\n").unwrap_err();
        assert!(err.to_string().contains("nebula"));
    }

    #[test]
    fn rejects_bad_yaml() {
        let err = ClientConfig::from_yaml_str("seed: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed: 7\nnebula_bakes: 1\nboot:\n  watchdog_ms: 500").unwrap();
        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.nebula_bakes, 1);
        assert_eq!(config.boot.watchdog_ms, 500.0);
        assert_eq!(config.boot.paint_frames, 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
