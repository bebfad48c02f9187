use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Errors from loading configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Simulation configuration: physics stepping, collision hull correction,
/// explosion and scramble parameters.
///
/// Every field has a default, so a YAML file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World gravity in m/s².
    pub gravity: Vec3,
    /// Internal physics step length in seconds.
    pub fixed_timestep: f32,
    /// Maximum internal steps taken for one tick delta.
    pub max_substeps: u32,
    /// Uniform shrink applied to collision hulls (not to visual geometry).
    pub hull_scale: f32,
    /// Flight speed of armed fragments, world units per second.
    pub explosion_speed: f32,
    /// World point explosion directions radiate from.
    pub explosion_center: Vec3,
    /// Radius of the circle a scrambled fragment set is laid out on.
    pub scramble_radius: f32,
    /// Side length of the cube a single scrambled fragment lands in.
    pub scramble_extent: f32,
    /// Mass given to fragments by `promote_all_to_dynamic` callers that have no opinion.
    pub dynamic_mass: f32,
    /// Seed for the scramble RNG.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.8, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 10,
            hull_scale: 0.99,
            explosion_speed: 5.0,
            explosion_center: Vec3::ZERO,
            scramble_radius: 150.0,
            scramble_extent: 10.0,
            dynamic_mass: 1.0,
            seed: 42,
        }
    }
}

impl SimConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_timestep > 0.0) {
            return Err(ConfigError::Invalid {
                field: "fixed_timestep",
                reason: format!("must be positive, got {}", self.fixed_timestep),
            });
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::Invalid {
                field: "max_substeps",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.hull_scale > 0.0 && self.hull_scale <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "hull_scale",
                reason: format!("must be in (0, 1], got {}", self.hull_scale),
            });
        }
        if !(self.dynamic_mass > 0.0) {
            return Err(ConfigError::Invalid {
                field: "dynamic_mass",
                reason: format!("must be positive, got {}", self.dynamic_mass),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = SimConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.max_substeps, 10);
        assert_eq!(c.hull_scale, 0.99);
        assert_eq!(c.explosion_speed, 5.0);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let c = SimConfig::from_yaml_str("explosion_speed: 12.5\nseed: 7\n").unwrap();
        assert_eq!(c.explosion_speed, 12.5);
        assert_eq!(c.seed, 7);
        assert_eq!(c.scramble_radius, 150.0);
    }

    #[test]
    fn rejects_out_of_range_hull_scale() {
        let err = SimConfig::from_yaml_str("hull_scale: 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "hull_scale", .. }));
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "max_substeps: 3\n").unwrap();
        let c = SimConfig::load(tmp.path()).unwrap();
        assert_eq!(c.max_substeps, 3);
    }
}
