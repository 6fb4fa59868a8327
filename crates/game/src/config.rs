//! Game configuration.
//!
//! Every tunable lives here, grouped per concern. Configs load from RON and
//! missing fields fall back to the shipped defaults, so a file only needs to
//! name what it overrides:
//!
//! ```ron
//! (
//!     tick_rate: 120,
//!     motor: (base_speed: 6.0),
//!     timer: (duration_secs: 240.0),
//! )
//! ```

use std::path::Path;

use crystalrun_physics::ControllerConfig;
use serde::{Deserialize, Serialize};

use crate::camera::CameraConfig;
use crate::error::ConfigError;
use crate::hazards::LayerConfig;
use crate::motor::{MotorConfig, MAX_TICK};
use crate::timer::TimerConfig;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Simulation tick rate (ticks per second). At least 16, so one tick
    /// never exceeds the longest step the motor integrates.
    pub tick_rate: u32,

    pub motor: MotorConfig,

    pub controller: ControllerConfig,

    pub camera: CameraConfig,

    pub layer: LayerConfig,

    pub timer: TimerConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            motor: MotorConfig::default(),
            controller: ControllerConfig::default(),
            camera: CameraConfig::default(),
            layer: LayerConfig::default(),
            timer: TimerConfig::default(),
        }
    }
}

impl GameConfig {
    /// A gentler setup: longer timer, softer hazards, bigger pickup reach.
    pub fn casual() -> Self {
        let mut config = Self::default();
        config.timer.duration_secs = 300.0;
        config.layer.knockback_force = 8.0;
        config.layer.pickup_radius = 1.5;
        config.motor.jump_power = 9.0;
        config
    }

    /// Get the time step per tick in seconds.
    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&source)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Reject values the simulation can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Invalid(message.to_string()));
        let motor = &self.motor;

        if self.tick_rate == 0 {
            return invalid("tick_rate must be positive");
        }
        if self.delta_time() > MAX_TICK {
            return invalid("tick_rate too low, a tick may not exceed 0.066 s (use 16 or more)");
        }
        if motor.half_height <= 0.0 || motor.radius <= 0.0 {
            return invalid("player dimensions must be positive");
        }
        if motor.radius > motor.half_height {
            return invalid("player radius cannot exceed half height");
        }
        if motor.base_speed <= 0.0 {
            return invalid("base_speed must be positive");
        }
        if motor.gravity >= 0.0 {
            return invalid("gravity must point down (negative)");
        }
        if motor.terminal_velocity <= 0.0 {
            return invalid("terminal_velocity must be positive");
        }
        if !(0.0..=1.0).contains(&motor.turn_factor) {
            return invalid("turn_factor must be within [0, 1]");
        }
        if motor.min_speed_multiplier <= 0.0 || motor.min_speed_multiplier > 1.0 {
            return invalid("min_speed_multiplier must be within (0, 1]");
        }
        if self.controller.offset < 0.0 {
            return invalid("controller offset cannot be negative");
        }
        if self.controller.min_slope_slide_angle > self.controller.max_slope_climb_angle {
            return invalid("min_slope_slide_angle cannot exceed max_slope_climb_angle");
        }
        if self.layer.pickup_radius <= 0.0
            || self.layer.hazard_radius <= 0.0
            || self.layer.jump_pad_radius <= 0.0
        {
            return invalid("trigger radii must be positive");
        }
        if self.camera.orbit.min_pitch > self.camera.orbit.max_pitch
            || self.camera.orbit.max_pitch.abs() >= std::f32::consts::FRAC_PI_2
            || self.camera.orbit.min_pitch.abs() >= std::f32::consts::FRAC_PI_2
        {
            return invalid("orbit pitch limits must be ordered and within +-90 degrees");
        }
        if self.timer.duration_secs <= 0.0 {
            return invalid("timer duration must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        GameConfig::default().validate().unwrap();
        GameConfig::casual().validate().unwrap();
        assert!((GameConfig::default().delta_time() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_ron_overrides_only_named_fields() {
        let config = GameConfig::from_ron_str(
            "(tick_rate: 120, motor: (base_speed: 6.0), timer: (duration_secs: 240.0))",
        )
        .unwrap();

        assert_eq!(config.tick_rate, 120);
        assert_eq!(config.motor.base_speed, 6.0);
        assert_eq!(config.motor.jump_power, MotorConfig::default().jump_power);
        assert_eq!(config.timer.duration_secs, 240.0);
        assert_eq!(config.layer, LayerConfig::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let config = GameConfig::casual();
        let text = config.to_ron_string().unwrap();
        assert_eq!(GameConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = GameConfig::from_ron_str("(tick_rate: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = GameConfig::from_ron_str("(tick_rate: 10)").unwrap_err();
        assert!(err.to_string().contains("tick_rate"));
        assert!(GameConfig::from_ron_str("(tick_rate: 16)").is_ok());

        let err = GameConfig::from_ron_str("(motor: (gravity: 9.8))").unwrap_err();
        assert!(err.to_string().contains("gravity"));

        let err = GameConfig::from_ron_str("(motor: (base_speed: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config =
            GameConfig::from_ron_str(include_str!("../../../config/default.ron")).unwrap();
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = GameConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.ron"));
    }
}
