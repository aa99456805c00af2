//! Render configuration.
//!
//! Loaded from an optional JSON file; missing fields take their defaults,
//! so `{}` is a valid configuration.

use std::path::{Path, PathBuf};

use frost_math::Vec4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accel::BuildStrategy;
use crate::progressive::FrameSettings;
use crate::scheduler::DEFAULT_TILE_SIZE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Render settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Render worker threads
    pub threads: usize,
    /// Tile edge in pixels
    pub tile_size: u32,
    /// Frames to accumulate, one sample per pixel each
    pub spp: u32,
    pub bvh: BuildStrategy,
    /// Output PNG path
    pub output: String,
    /// Optional eye/center/up camera file
    pub camera: Option<PathBuf>,
    /// Maximum path segments per sample
    pub bounces: u32,
    /// Self-intersection offset
    pub epsilon: f32,
    /// RGBA background for rays that escape
    pub background: [f32; 4],
    /// Vertical field of view in degrees
    pub fov_y: f32,
    /// Head light intensity
    pub light_intensity: f32,
    /// Base seed for per-tile random streams
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            threads: 8,
            tile_size: DEFAULT_TILE_SIZE,
            spp: 8,
            bvh: BuildStrategy::Binned,
            output: "rendered_snowman.png".to_string(),
            camera: None,
            bounces: 4,
            epsilon: 1e-3,
            background: [0.0, 0.0, 0.0, 1.0],
            fov_y: 45.0,
            light_intensity: std::f32::consts::PI,
            seed: 0x5EED,
        }
    }
}

impl RenderConfig {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject settings the renderer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.tile_size == 0 {
            return Err(ConfigError::Invalid("tile_size must be at least 1".into()));
        }
        if self.bounces == 0 {
            return Err(ConfigError::Invalid("bounces must be at least 1".into()));
        }
        if !(self.fov_y > 0.0 && self.fov_y < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "fov_y {} must be between 0 and 180 degrees",
                self.fov_y
            )));
        }
        Ok(())
    }

    /// Shading settings for [`crate::ProgressiveRenderer`].
    pub fn frame_settings(&self) -> FrameSettings {
        FrameSettings {
            bounces: self.bounces,
            epsilon: self.epsilon,
            background: Vec4::from_array(self.background),
            light_intensity: self.light_intensity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!((config.width, config.height), (512, 512));
        assert_eq!(config.threads, 8);
        assert_eq!(config.tile_size, 16);
        assert_eq!(config.spp, 8);
        assert_eq!(config.bvh, BuildStrategy::Binned);
        assert_eq!(config.output, "rendered_snowman.png");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RenderConfig =
            serde_json::from_str(r#"{ "width": 64, "bvh": "split", "background": [1, 1, 1, 1] }"#)
                .unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 512);
        assert_eq!(config.bvh, BuildStrategy::Split);
        assert_eq!(config.frame_settings().background, Vec4::ONE);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        std::fs::write(&path, r#"{ "spp": 2, "camera": "views/front.cam" }"#).unwrap();

        let config = RenderConfig::load(&path).unwrap();
        assert_eq!(config.spp, 2);
        assert_eq!(config.camera, Some(PathBuf::from("views/front.cam")));

        std::fs::write(&path, r#"{ "threads": 0 }"#).unwrap();
        assert!(matches!(RenderConfig::load(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, r#"{ "tile_size": 0 }"#).unwrap();
        assert!(matches!(RenderConfig::load(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(RenderConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
