//! Character motor.
//!
//! This is the main entry point for player movement. Every tick it turns the
//! input state and camera heading into a desired displacement, resolves it
//! through the physics character controller and commits the result to the
//! player's body.
//!
//! The motor exclusively owns [`PlayerState`] and the player body. Other
//! systems (hazards, jump pads, mud) go through its setters.

use crystalrun_physics::{
    BodyDesc, BodyHandle, CharacterController, ColliderDesc, ColliderHandle, ContentFlags,
    ControllerConfig, PhysicsError, PhysicsWorld,
};
use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::input::{Action, InputState};

/// Longest tick the motor will integrate, in seconds.
pub(crate) const MAX_TICK: f32 = 0.066;

/// Horizontal impulses below this speed are dropped.
const MIN_IMPULSE_SPEED: f32 = 0.01;

/// Which way "forward" points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementBasis {
    /// Forward is away from the camera. Needs a camera heading every tick.
    #[default]
    CameraRelative,
    /// Forward is world -Z, right is world +X.
    World,
}

/// Collider used for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerShape {
    #[default]
    Capsule,
    Cylinder,
}

/// How corrected movement is handed to the physics body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyMode {
    /// Kinematic body, next translation set directly.
    #[default]
    Kinematic,
    /// Dynamic body, linear velocity set to displacement / dt.
    Dynamic,
}

/// Configuration for the character motor.
///
/// All values use metric units (meters, seconds) unless otherwise noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    // ========================================================================
    // Player Dimensions
    // ========================================================================
    /// Half the player's height (meters).
    pub half_height: f32,

    /// Collision radius (meters).
    pub radius: f32,

    /// Collider shape.
    pub shape: PlayerShape,

    // ========================================================================
    // Movement
    // ========================================================================
    /// Walking speed at multiplier 1.0 (meters/second).
    pub base_speed: f32,

    /// Fraction of the remaining yaw covered each tick when turning.
    pub turn_factor: f32,

    /// Smallest accepted speed multiplier.
    pub min_speed_multiplier: f32,

    /// Which way input directions point.
    pub movement_basis: MovementBasis,

    /// How corrected movement reaches the body.
    pub body_mode: BodyMode,

    // ========================================================================
    // Vertical
    // ========================================================================
    /// Gravity acceleration (meters/second², negative is down).
    pub gravity: f32,

    /// Upward speed given by a jump (meters/second).
    pub jump_power: f32,

    /// Fastest allowed fall (meters/second, positive).
    pub terminal_velocity: f32,

    /// Time after a jump before another can trigger (seconds).
    pub jump_cooldown: f32,

    // ========================================================================
    // Knockback
    // ========================================================================
    /// Fraction of a knockback force applied as upward speed.
    pub knockback_lift: f32,

    /// Decay rate of horizontal knockback speed (1/seconds).
    pub knockback_damping: f32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            half_height: 0.9,
            radius: 0.5,
            shape: PlayerShape::Capsule,

            base_speed: 5.0,
            turn_factor: 0.1,
            min_speed_multiplier: 0.01,
            movement_basis: MovementBasis::CameraRelative,
            body_mode: BodyMode::Kinematic,

            gravity: -19.62,
            jump_power: 8.0,
            terminal_velocity: 50.0,
            jump_cooldown: 0.1,

            knockback_lift: 0.5,
            knockback_damping: 4.0,
        }
    }
}

/// Animation the visual model should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimationState {
    #[default]
    Idle,
    Walking,
    Jumping,
    Falling,
}

/// Player state, mutated once per tick by the motor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Feet position (body center minus half height).
    pub position: Vec3,
    /// Facing angle around +Y (radians).
    pub orientation_yaw: f32,
    /// Signed vertical speed, zeroed on landing.
    pub vertical_velocity: f32,
    pub is_grounded: bool,
    /// Seconds until another jump may trigger.
    pub jump_cooldown: f32,
    /// Speed scale in `(0, 1]`.
    pub speed_multiplier: f32,
    /// Horizontal knockback speed, decaying over time.
    pub impulse: Vec3,
    pub animation: AnimationState,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation_yaw: 0.0,
            vertical_velocity: 0.0,
            is_grounded: false,
            jump_cooldown: 0.0,
            speed_multiplier: 1.0,
            impulse: Vec3::ZERO,
            animation: AnimationState::Idle,
        }
    }
}

/// Transform published to the renderer once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerTransform {
    pub position: Vec3,
    pub yaw: f32,
    pub animation: AnimationState,
}

/// What a motor tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorStep {
    /// Displacement asked of the controller.
    pub desired: Vec3,
    /// Displacement the controller allowed.
    pub corrected: Vec3,
    pub jumped: bool,
    pub landed: bool,
}

/// Handles of the player's physics objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlayerBody {
    body: BodyHandle,
    collider: ColliderHandle,
}

/// Character motor.
///
/// # Example
///
/// ```ignore
/// let mut motor = CharacterMotor::new(MotorConfig::default(), ControllerConfig::default());
/// motor.attach(&mut world, spawn)?;
///
/// // Each frame:
/// motor.update(&mut world, &mut input, camera.heading(), dt)?;
/// world.step(dt);
/// motor.sync_transform(&world);
/// ```
#[derive(Debug, Clone)]
pub struct CharacterMotor {
    config: MotorConfig,
    controller: CharacterController,
    state: PlayerState,
    body: Option<PlayerBody>,
    spawn: Vec3,
}

impl CharacterMotor {
    pub fn new(config: MotorConfig, controller: ControllerConfig) -> Self {
        Self {
            config,
            controller: CharacterController::new(controller),
            state: PlayerState::default(),
            body: None,
            spawn: Vec3::ZERO,
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(MotorConfig::default(), ControllerConfig::default())
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn controller(&self) -> &CharacterController {
        &self.controller
    }

    pub fn is_attached(&self) -> bool {
        self.body.is_some()
    }

    pub fn body_handle(&self) -> Option<BodyHandle> {
        self.body.map(|b| b.body)
    }

    pub fn collider_handle(&self) -> Option<ColliderHandle> {
        self.body.map(|b| b.collider)
    }

    /// Feet position, once the player exists.
    pub fn position(&self) -> Option<Vec3> {
        self.body.map(|_| self.state.position)
    }

    /// Create the player's body and collider with its center at `spawn`.
    pub fn attach(&mut self, world: &mut PhysicsWorld, spawn: Vec3) -> Result<(), PhysicsError> {
        self.detach(world);

        let body_desc = match self.config.body_mode {
            BodyMode::Kinematic => BodyDesc::kinematic_position_based(),
            BodyMode::Dynamic => BodyDesc::dynamic(),
        };
        let body = world.create_body(body_desc.translation(spawn));

        let collider_desc = match self.config.shape {
            PlayerShape::Capsule => ColliderDesc::capsule(self.config.half_height, self.config.radius),
            PlayerShape::Cylinder => {
                ColliderDesc::cylinder(self.config.half_height, self.config.radius)
            }
        };
        let collider =
            world.create_collider(collider_desc.contents(ContentFlags::PLAYER_BODY), Some(body))?;

        self.body = Some(PlayerBody { body, collider });
        self.spawn = spawn;
        self.state = PlayerState {
            position: self.feet(spawn),
            ..PlayerState::default()
        };
        self.controller = CharacterController::new(self.controller.config().clone());

        log::debug!("player attached at {spawn:?}");
        Ok(())
    }

    /// Release the player's body and collider.
    pub fn detach(&mut self, world: &mut PhysicsWorld) {
        if let Some(player) = self.body.take() {
            world.remove_body(player.body);
        }
    }

    /// Teleport back to the spawn point with a clean state.
    pub fn respawn(&mut self, world: &mut PhysicsWorld) -> Result<(), PhysicsError> {
        let Some(player) = self.body else {
            return Ok(());
        };
        world.set_translation(player.body, self.spawn)?;
        world.set_linvel(player.body, Vec3::ZERO)?;

        self.state = PlayerState {
            position: self.feet(self.spawn),
            orientation_yaw: self.state.orientation_yaw,
            speed_multiplier: self.state.speed_multiplier,
            ..PlayerState::default()
        };
        log::info!("player respawned at {:?}", self.spawn);
        Ok(())
    }

    // ========================================================================
    // Setters for other systems
    // ========================================================================

    /// Scale walking speed. Clamped into `(0, 1]`; non-finite values are ignored.
    pub fn set_speed_multiplier(&mut self, value: f32) {
        if !value.is_finite() {
            log::warn!("ignoring non-finite speed multiplier {value}");
            return;
        }
        self.state.speed_multiplier = value.clamp(self.config.min_speed_multiplier, 1.0);
    }

    /// Knock the player along `direction` with the given force.
    ///
    /// Vertical speed becomes a fraction of the force and the horizontal part
    /// of the direction becomes a decaying impulse. Each hit replaces the
    /// previous impulse, so standing next to a hazard never pushes harder
    /// than one hit.
    pub fn apply_knockback(&mut self, direction: Vec3, force: f32) {
        let horizontal = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
        if horizontal != Vec3::ZERO {
            self.state.impulse = horizontal * force;
        }
        self.state.vertical_velocity = force * self.config.knockback_lift;
        self.state.is_grounded = false;
        log::debug!("knockback {horizontal:?} x {force}");
    }

    /// Launch the player upward, overriding any fall speed.
    pub fn launch(&mut self, force: f32) {
        self.state.vertical_velocity = force;
        self.state.is_grounded = false;
        log::debug!("launched with {force}");
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Run one motor tick.
    ///
    /// `camera_heading` is the camera's look direction; it is required when
    /// movement is camera-relative. Without it, or before [`Self::attach`],
    /// the tick does nothing and returns `Ok(None)`, leaving input untouched.
    ///
    /// On a completed tick the edge-triggered input flags are cleared.
    pub fn update(
        &mut self,
        world: &mut PhysicsWorld,
        input: &mut InputState,
        camera_heading: Option<Vec3>,
        dt: f32,
    ) -> Result<Option<MotorStep>, PhysicsError> {
        let Some(player) = self.body else {
            return Ok(None);
        };
        let heading = match (self.config.movement_basis, camera_heading) {
            (MovementBasis::CameraRelative, None) => return Ok(None),
            (MovementBasis::CameraRelative, heading) => heading,
            (MovementBasis::World, _) => None,
        };

        let dt = dt.clamp(0.0, MAX_TICK);
        let snapshot = input.snapshot();
        let cfg = &self.config;

        // Ride whatever we stood on last tick before it is forgotten
        let carry = self.platform_carry(world);

        // 1. Ground, probed from where the carry will put us
        let was_grounded = self
            .controller
            .query_grounded_at(world, player.collider, carry)?;
        self.state.is_grounded = was_grounded;

        // 2. Intent
        let axes = snapshot.movement_axes();
        let intent = match heading {
            Some(look) => {
                let forward = Vec3::new(look.x, 0.0, look.z).normalize_or_zero();
                let right = forward.cross(Vec3::Y);
                right * axes.x + forward * axes.y
            }
            None => Vec3::new(axes.x, 0.0, -axes.y),
        };

        // 3. Orientation
        if intent.length_squared() > 1e-6 {
            let target = intent.x.atan2(intent.z);
            self.state.orientation_yaw =
                slerp_yaw(self.state.orientation_yaw, target, cfg.turn_factor);
        }

        // 4. Scale
        let horizontal =
            intent.normalize_or_zero() * cfg.base_speed * self.state.speed_multiplier * dt;

        // 5. Jump
        let mut jumped = false;
        if snapshot.just_pressed(Action::Jump)
            && self.state.is_grounded
            && self.state.jump_cooldown <= 0.0
        {
            self.state.vertical_velocity = cfg.jump_power;
            self.state.is_grounded = false;
            self.state.jump_cooldown = cfg.jump_cooldown;
            jumped = true;
            log::debug!("jump at {:?}", self.state.position);
        }

        // 6. Cooldown
        self.state.jump_cooldown -= dt;

        // 7. Gravity
        if !self.state.is_grounded && !jumped {
            self.state.vertical_velocity = (self.state.vertical_velocity + cfg.gravity * dt)
                .max(-cfg.terminal_velocity);
        }

        // 8. Desired displacement
        let desired = Vec3::new(horizontal.x, self.state.vertical_velocity * dt, horizontal.z)
            + self.state.impulse * dt
            + Vec3::new(carry.x, carry.y.min(0.0), carry.z);

        // 9. Resolve
        let corrected =
            self.controller
                .compute_collider_movement(world, player.collider, desired)?;
        let outcome = *self.controller.computed_outcome();

        // 10. Commit
        let current = world
            .body(player.body)
            .ok_or(PhysicsError::UnknownBody(player.body))?
            .translation();
        let target = current + corrected;
        match cfg.body_mode {
            BodyMode::Kinematic => world.set_next_kinematic_translation(player.body, target)?,
            BodyMode::Dynamic => {
                let linvel = if dt > 0.0 { corrected / dt } else { Vec3::ZERO };
                world.set_linvel(player.body, linvel)?;
            }
        }

        if outcome.hit_ceiling && self.state.vertical_velocity > 0.0 {
            self.state.vertical_velocity = 0.0;
        }

        // 11. Ground after the move
        self.state.is_grounded = outcome.grounded;
        let landed = outcome.grounded && !was_grounded;
        if outcome.grounded {
            self.state.vertical_velocity = 0.0;
        }
        if landed {
            log::debug!("landed at {target:?}");
        }

        self.state.position = self.feet(target);
        self.decay_impulse(dt);

        // 12. Animation
        self.state.animation = if self.state.is_grounded {
            if intent.length_squared() > 1e-6 {
                AnimationState::Walking
            } else {
                AnimationState::Idle
            }
        } else if self.state.vertical_velocity > 0.0 {
            AnimationState::Jumping
        } else {
            AnimationState::Falling
        };

        input.reset_just_pressed();

        log::trace!(
            "motor: desired {desired:?} corrected {corrected:?} grounded={} vy={:.3}",
            self.state.is_grounded,
            self.state.vertical_velocity
        );

        Ok(Some(MotorStep {
            desired,
            corrected,
            jumped,
            landed,
        }))
    }

    /// Read the body back after the world step and publish the transform.
    pub fn sync_transform(&mut self, world: &PhysicsWorld) -> Option<PlayerTransform> {
        let player = self.body?;
        let center = world.body(player.body)?.translation();
        self.state.position = self.feet(center);
        Some(self.transform())
    }

    /// Current transform for the renderer.
    pub fn transform(&self) -> PlayerTransform {
        PlayerTransform {
            position: self.state.position,
            yaw: self.state.orientation_yaw,
            animation: self.state.animation,
        }
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn feet(&self, center: Vec3) -> Vec3 {
        center - Vec3::Y * self.config.half_height
    }

    /// How far the body we stood on moved since the last step.
    fn platform_carry(&self, world: &PhysicsWorld) -> Vec3 {
        if !self.state.is_grounded {
            return Vec3::ZERO;
        }
        self.controller
            .computed_outcome()
            .ground_collider
            .and_then(|handle| world.collider(handle))
            .and_then(|collider| collider.parent())
            .and_then(|body| world.body(body))
            .map_or(Vec3::ZERO, |body| body.frame_delta())
    }

    fn decay_impulse(&mut self, dt: f32) {
        self.state.impulse *= (-self.config.knockback_damping * dt).exp();
        if self.state.impulse.length() < MIN_IMPULSE_SPEED {
            self.state.impulse = Vec3::ZERO;
        }
    }
}

/// Turn from `current` toward `target` by `factor` along the shortest arc.
fn slerp_yaw(current: f32, target: f32, factor: f32) -> f32 {
    let from = Quat::from_rotation_y(current);
    let to = Quat::from_rotation_y(target);
    let (yaw, _, _) = from.slerp(to, factor.clamp(0.0, 1.0)).to_euler(EulerRot::YXZ);
    yaw
}

// ============================================================================
// Tests
// ============================================================================
