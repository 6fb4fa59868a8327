//! Character controller configuration.
//!
//! Defaults are the values the platformer ships with: a 1 cm skin, 10 cm
//! ground snap, 60° climbable slopes and 0.5 m steps.

use std::f32::consts::{FRAC_PI_3, FRAC_PI_4};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::ContentFlags;

/// Step climbing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutostepConfig {
    /// Highest ledge that is stepped onto instead of blocking (meters).
    pub max_height: f32,

    /// Free room required on top of the ledge (meters).
    pub min_width: f32,

    /// Whether colliders on dynamic bodies can be stepped onto.
    pub include_dynamic_bodies: bool,
}

impl Default for AutostepConfig {
    fn default() -> Self {
        Self {
            max_height: 0.5,
            min_width: 0.35,
            include_dynamic_bodies: true,
        }
    }
}

/// Configuration for the kinematic character controller.
///
/// All values use metric units (meters, radians) unless otherwise noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // ========================================================================
    // Contact
    // ========================================================================
    /// Gap kept between the character and everything it touches (meters).
    pub offset: f32,

    /// Up direction of the world.
    pub up: Vec3,

    /// What blocks the character.
    pub mask: ContentFlags,

    // ========================================================================
    // Ground
    // ========================================================================
    /// Snap down onto ground within this distance while walking (meters).
    /// `None` disables snapping.
    pub snap_to_ground: Option<f32>,

    /// How far below the character ground is still detected (meters).
    pub ground_probe_distance: f32,

    // ========================================================================
    // Slopes
    // ========================================================================
    /// Steepest slope the character can walk up (radians).
    pub max_slope_climb_angle: f32,

    /// Slopes steeper than this make the character slide down (radians).
    pub min_slope_slide_angle: f32,

    // ========================================================================
    // Steps and Sliding
    // ========================================================================
    /// Step climbing, `None` to block on every ledge.
    pub autostep: Option<AutostepConfig>,

    /// Maximum slide iterations per move.
    pub max_slide_iterations: usize,

    /// Overbounce factor when clipping against surfaces.
    /// Slightly above 1.0 keeps the character from re-touching the plane.
    pub overbounce: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            offset: 0.01,
            up: Vec3::Y,
            mask: ContentFlags::MASK_PLAYER_SOLID,

            snap_to_ground: Some(0.1),
            ground_probe_distance: 0.05,

            max_slope_climb_angle: FRAC_PI_3,
            min_slope_slide_angle: FRAC_PI_4,

            autostep: Some(AutostepConfig::default()),
            max_slide_iterations: 5,
            overbounce: 1.001,
        }
    }
}

impl ControllerConfig {
    /// No stepping and no snapping, every ledge and drop is taken literally.
    pub fn rigid() -> Self {
        Self {
            snap_to_ground: None,
            autostep: None,
            ..Self::default()
        }
    }

    /// Angle between a surface normal and the up direction.
    pub fn slope_angle(&self, normal: Vec3) -> f32 {
        normal.dot(self.up).clamp(-1.0, 1.0).acos()
    }

    /// Whether a surface can be stood on.
    pub fn is_walkable(&self, normal: Vec3) -> bool {
        self.slope_angle(normal) <= self.max_slope_climb_angle + 1e-4
    }
}
