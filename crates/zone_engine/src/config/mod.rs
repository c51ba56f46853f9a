//! Engine settings
//!
//! Engine-wide tunables live in [`EngineConfig`]; per-zone defaults in
//! [`ZoneOptions`]. Both can be loaded from TOML or RON files through the
//! [`Config`] trait.

use std::fs;
use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::containment::{AccuracyLevel, DetectionLevel};
use crate::spatial::OctreeConfig;

/// File formats a [`Config`] can be read from or written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Serde-backed settings that round-trip through `.toml` or `.ron` files
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Read and parse a settings file, picking the format from its extension
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let text = fs::read_to_string(path)?;
        match format {
            Format::Toml => toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Write the settings in the format named by the extension
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };
        fs::write(path, text)?;
        Ok(())
    }
}

/// Failures while loading or saving settings
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// File contents did not parse
    #[error("config parse failed: {0}")]
    Parse(String),

    /// Settings could not be serialized
    #[error("config serialization failed: {0}")]
    Serialize(String),

    /// Extension is neither `.toml` nor `.ron`
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Settings applied to a zone when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneOptions {
    /// Probe density for non-exact tests
    pub accuracy: AccuracyLevel,
    /// What "inside" means while the occupant is outside
    pub enter_detection: DetectionLevel,
    /// What "inside" means while the occupant is inside
    pub exit_detection: DetectionLevel,
    /// Re-evaluate when zone geometry or the tracked set changes
    pub auto_update: bool,
    /// Collapse on-demand triggers arriving within the update window
    pub respect_update_queue: bool,
}

impl Default for ZoneOptions {
    fn default() -> Self {
        Self {
            accuracy: AccuracyLevel::High,
            enter_detection: DetectionLevel::Automatic,
            exit_detection: DetectionLevel::Automatic,
            auto_update: true,
            respect_update_queue: true,
        }
    }
}

/// Engine-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest single-part dimension accepted by the host physics engine;
    /// boxes built with [`ZoneGeometry::from_region`](crate::geometry::ZoneGeometry::from_region)
    /// are subdivided above it
    pub max_part_size: f32,
    /// Debounce window for on-demand updates, in host time units
    pub update_queue_window: f64,
    /// Rejection-sampling budget for random points
    pub random_point_attempts: u32,
    /// Minimum time between heartbeat evaluations; zero evaluates every step
    pub heartbeat_interval: f64,
    /// `Automatic` detection uses centroid checks once the zone volume
    /// exceeds this multiple of the combined tracked volume
    pub automatic_volume_ratio: f32,
    /// Defaults for newly created zones
    pub zone_defaults: ZoneOptions,
    /// Default broad-phase octree layout
    pub octree: OctreeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_part_size: 2024.0,
            update_queue_window: 0.1,
            random_point_attempts: 1000,
            heartbeat_interval: 0.0,
            automatic_volume_ratio: 8.0,
            zone_defaults: ZoneOptions::default(),
            octree: OctreeConfig::default(),
        }
    }
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Check value ranges that would make evaluation meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_part_size.is_finite() && self.max_part_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_part_size must be positive, got {}",
                self.max_part_size
            )));
        }
        if !(self.update_queue_window >= 0.0 && self.heartbeat_interval >= 0.0) {
            return Err(ConfigError::Invalid("time intervals must not be negative".to_string()));
        }
        if self.random_point_attempts == 0 {
            return Err(ConfigError::Invalid("random_point_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_host_limits() {
        let config = EngineConfig::default();
        assert_eq!(config.max_part_size, 2024.0);
        assert!((config.update_queue_window - 0.1).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_override() {
        let config: EngineConfig = toml::from_str("max_part_size = 512.0\n").unwrap();
        assert_eq!(config.max_part_size, 512.0);
        assert_eq!(config.random_point_attempts, 1000);
        assert!(config.zone_defaults.auto_update);
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join("zone_engine_config_test.ron");
        let mut config = EngineConfig::default();
        config.heartbeat_interval = 0.25;
        config.zone_defaults.accuracy = AccuracyLevel::Low;
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = EngineConfig::load_from_file("zones.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_validate_rejects_zero_part_size() {
        let config = EngineConfig { max_part_size: 0.0, ..EngineConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
