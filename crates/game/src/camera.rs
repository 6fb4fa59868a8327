//! Third-person camera rig.
//!
//! Two policies:
//! - **Follow**: a fixed world offset from the player, eased toward each tick.
//! - **Orbit**: yaw/pitch driven by mouse drag and look keys, the camera sits
//!   on a sphere around the player.
//!
//! Either way the camera position is only ever approached by interpolation.
//! [`CameraRig::snap_to`] is the one exception, used on level (re)start.

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Reference tick rate the smoothing factors are tuned for.
const SMOOTHING_RATE: f32 = 60.0;

/// Which camera behaviour is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraPolicy {
    #[default]
    Follow,
    Orbit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    /// World-space offset from the player's feet.
    pub offset: Vec3,
    /// Fraction of the gap closed per 60 Hz tick.
    pub smoothing: f32,
    /// Height above the feet the camera looks at.
    pub look_height: f32,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 5.0, 15.0),
            smoothing: 0.05,
            look_height: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// Distance from the look point (meters).
    pub distance: f32,
    pub look_height: f32,
    /// Starting pitch (radians, positive is above the player).
    pub initial_pitch: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,
    /// Radians per pixel of mouse drag.
    pub drag_sensitivity: f32,
    /// Radians per second while a look key is held.
    pub key_speed: f32,
    /// Fraction of the gap closed per 60 Hz tick.
    pub smoothing: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            distance: 10.0,
            look_height: 2.0,
            initial_pitch: 0.35,
            min_pitch: -0.2,
            max_pitch: 1.4,
            drag_sensitivity: 0.005,
            key_speed: 2.0,
            smoothing: 0.15,
        }
    }
}

/// Camera configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub policy: CameraPolicy,
    pub follow: FollowConfig,
    pub orbit: OrbitConfig,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            policy: CameraPolicy::Follow,
            follow: FollowConfig::default(),
            orbit: OrbitConfig::default(),
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            aspect: 16.0 / 9.0,
        }
    }
}

/// Look input gathered for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LookInput {
    /// Mouse drag in pixels.
    pub drag: Vec2,
    /// Look key axes, `x` turns right and `y` looks up.
    pub keys: Vec2,
}

/// Smoothed third-person camera.
#[derive(Debug, Clone)]
pub struct CameraRig {
    config: CameraConfig,
    position: Vec3,
    look_at: Vec3,
    yaw: f32,
    pitch: f32,
    initialized: bool,
}

impl CameraRig {
    pub fn new(config: CameraConfig) -> Self {
        let pitch = config.orbit.initial_pitch;
        Self {
            config,
            position: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            yaw: 0.0,
            pitch,
            initialized: false,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    /// Orbit angles (yaw, pitch) in radians.
    pub fn angles(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Place the camera at its resting spot for `player` without easing.
    pub fn snap_to(&mut self, player: Vec3) {
        let (position, look_at) = self.desired(player);
        self.position = position;
        self.look_at = look_at;
        self.initialized = true;
    }

    /// Ease toward the resting spot for the player's feet position.
    pub fn update(&mut self, player: Vec3, look: LookInput, dt: f32) {
        if self.config.policy == CameraPolicy::Orbit {
            let orbit = &self.config.orbit;
            self.yaw -= look.drag.x * orbit.drag_sensitivity + look.keys.x * orbit.key_speed * dt;
            self.yaw %= std::f32::consts::TAU;
            self.pitch = (self.pitch + look.drag.y * orbit.drag_sensitivity
                - look.keys.y * orbit.key_speed * dt)
                .clamp(orbit.min_pitch, orbit.max_pitch);
        }

        if !self.initialized {
            self.snap_to(player);
            return;
        }

        let smoothing = match self.config.policy {
            CameraPolicy::Follow => self.config.follow.smoothing,
            CameraPolicy::Orbit => self.config.orbit.smoothing,
        };
        let t = 1.0 - (1.0 - smoothing.clamp(0.0, 1.0)).powf(dt * SMOOTHING_RATE);

        let (position, look_at) = self.desired(player);
        self.position = self.position.lerp(position, t);
        self.look_at = look_at;
    }

    /// Flattened look direction for camera-relative movement.
    ///
    /// `None` until the camera has been placed.
    pub fn heading(&self) -> Option<Vec3> {
        if !self.initialized {
            return None;
        }
        let forward = self.look_at - self.position;
        let flat = Vec3::new(forward.x, 0.0, forward.z);
        if flat.length_squared() > 1e-8 {
            Some(flat.normalize())
        } else {
            Some(Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos()))
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_at, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.config.fov.to_radians(),
            self.config.aspect,
            self.config.near,
            self.config.far,
        )
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    fn desired(&self, player: Vec3) -> (Vec3, Vec3) {
        match self.config.policy {
            CameraPolicy::Follow => {
                let follow = &self.config.follow;
                (
                    player + follow.offset,
                    player + Vec3::Y * follow.look_height,
                )
            }
            CameraPolicy::Orbit => {
                let orbit = &self.config.orbit;
                let look_at = player + Vec3::Y * orbit.look_height;
                let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
                let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
                let offset = Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw);
                (look_at + offset * orbit.distance, look_at)
            }
        }
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
