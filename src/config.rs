use std::error::Error;
use std::fmt;

use bevy::prelude::*;

use crate::tread::TreadGeometry;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A value that must be strictly positive is not.
    NotPositive { name: &'static str, value: f32 },
    /// The top of the tread loop is not above its bottom.
    InvertedTread { top: f32, bottom: f32 },
    NoTreadSegments,
    /// A value lies outside of the `[min, max]` range.
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive { name, value } => {
                write!(f, "'{}' must be greater than 0, got {}", name, value)
            }
            Self::InvertedTread { top, bottom } => write!(
                f,
                "top of tread ({}) must be above its bottom ({})",
                top, bottom
            ),
            Self::NoTreadSegments => write!(f, "tread must have at least one segment"),
            Self::OutOfRange {
                name,
                value,
                min,
                max,
            } => write!(
                f,
                "'{}' must be in range [{}, {}], got {}",
                name, min, max, value
            ),
        }
    }
}

impl Error for ConfigError {}

pub(crate) fn ensure_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0. {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

pub(crate) fn ensure_in_range(
    name: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TankTuning {
    pub mass: f32,
    pub drive_force: f32,
    pub max_speed: f32,
    /// Degrees per second at full turn input.
    pub turn_rate: f32,
    pub brake_factor: f32,
    pub linear_damping: f32,
    /// Seconds between two shots.
    pub fire_interval: f32,
    /// Degrees of aim per unit of mouse motion.
    pub look_sensitivity: f32,
    pub min_aim_pitch: f32,
    pub max_aim_pitch: f32,
    /// Tread speed per unit of throttle input.
    pub tread_forward_scale: f32,
    /// Tread speed difference per unit of turn input.
    pub tread_turn_scale: f32,
    pub camera_arm_length: f32,
    pub camera_height: f32,
}

impl Default for TankTuning {
    fn default() -> Self {
        Self {
            mass: 8000.,
            drive_force: 8_000_000.,
            max_speed: 2400.,
            turn_rate: 120.,
            brake_factor: 5000.,
            linear_damping: 2.,
            fire_interval: 0.5,
            look_sensitivity: 0.5,
            min_aim_pitch: -50.,
            max_aim_pitch: 0.,
            tread_forward_scale: 1000.,
            tread_turn_scale: 500.,
            camera_arm_length: 1200.,
            camera_height: 100.,
        }
    }
}

impl TankTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("mass", self.mass)?;
        ensure_positive("max_speed", self.max_speed)?;
        ensure_positive("fire_interval", self.fire_interval)?;
        if self.min_aim_pitch > self.max_aim_pitch {
            return Err(ConfigError::OutOfRange {
                name: "min_aim_pitch",
                value: self.min_aim_pitch,
                min: f32::NEG_INFINITY,
                max: self.max_aim_pitch,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileTuning {
    pub speed: f32,
    /// Seconds before an unexploded shell is removed.
    pub lifetime: f32,
    pub gravity_scale: f32,
    pub explosion_radius: f32,
    pub explosion_damage: f32,
    pub explosion_effect_scale: f32,
    /// Seconds before the explosion effect is deactivated.
    pub explosion_effect_duration: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 8000.,
            lifetime: 5.,
            gravity_scale: 0.15,
            explosion_radius: 300.,
            explosion_damage: 50.,
            explosion_effect_scale: 1.5,
            explosion_effect_duration: 1.5,
        }
    }
}

impl ProjectileTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("speed", self.speed)?;
        ensure_positive("lifetime", self.lifetime)?;
        ensure_positive("explosion_radius", self.explosion_radius)?;
        ensure_in_range("gravity_scale", self.gravity_scale, 0., 10.)
    }
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SandboxConfig {
    pub tank: TankTuning,
    pub tread: TreadGeometry,
    pub projectile: ProjectileTuning,
}

impl SandboxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tank.validate()?;
        self.tread.validate()?;
        self.projectile.validate()
    }

    /// Returns the given config if it is valid, otherwise logs the problem
    /// and returns default values.
    pub fn validated_or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(err) => {
                error!("Invalid sandbox config: {}; default values will be used", err);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SandboxConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_invalid_tank_mass() {
        let mut config = SandboxConfig::default();
        config.tank.mass = 0.;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                name: "mass",
                value: 0.
            })
        );
    }

    #[test]
    fn test_validated_or_default_replaces_broken_config() {
        let mut config = SandboxConfig::default();
        config.projectile.speed = f32::NAN;
        let config = config.validated_or_default();
        assert_eq!(config, SandboxConfig::default());
    }

    #[test]
    fn test_error_message() {
        let err = ConfigError::InvertedTread {
            top: -1.,
            bottom: 2.,
        };
        assert_eq!(
            err.to_string(),
            "top of tread (-1) must be above its bottom (2)"
        );
    }
}
