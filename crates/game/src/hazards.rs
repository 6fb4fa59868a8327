//! Hazards, pickups, jump pads and slow zones.
//!
//! The layer runs after the physics step. It measures distances from the
//! player's body center to every active entity and applies effects only
//! through the motor's setters ([`CharacterMotor::apply_knockback`],
//! [`CharacterMotor::launch`], [`CharacterMotor::set_speed_multiplier`]).
//! Score and completion are reported through [`LevelEvents`].

use crystalrun_physics::{
    BodyDesc, BodyHandle, ColliderDesc, ColliderHandle, ColliderShape, ContentFlags, PhysicsError,
    PhysicsWorld,
};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::motor::CharacterMotor;
use crate::obstacle::{EntityShape, Transform};

/// Multiplier differences below this snap to the target.
const BLEND_EPSILON: f32 = 1e-3;

/// Callbacks into the HUD / level flow.
pub trait LevelEvents {
    /// A pickup was collected; `count` is the running total.
    fn on_pickup_collected(&mut self, _count: u32) {}

    /// The last pickup was collected. Fires once per level.
    fn on_all_collected(&mut self) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl LevelEvents for NoEvents {}

/// Configuration for the hazard layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Distance at which a pickup is collected (meters).
    pub pickup_radius: f32,

    /// Distance at which a hazard knocks the player back (meters).
    pub hazard_radius: f32,

    /// Knockback force for hazards that don't set their own.
    pub knockback_force: f32,

    /// Distance at which a jump pad fires (meters).
    pub jump_pad_radius: f32,

    /// Time before a pad can fire again (seconds).
    pub jump_pad_cooldown: f32,

    /// How fast the speed multiplier eases toward its target (1/seconds).
    pub slow_blend_rate: f32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            pickup_radius: 1.0,
            hazard_radius: 2.0,
            knockback_force: 15.0,
            jump_pad_radius: 1.5,
            jump_pad_cooldown: 0.3,
            // 2% of the gap per tick at 60 Hz
            slow_blend_rate: 1.212,
        }
    }
}

// ============================================================================
// Level definitions
// ============================================================================

/// Axis a hazard spins around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpinAxis {
    X,
    Y,
    Z,
}

impl SpinAxis {
    fn rotation(self, angle: f32) -> Quat {
        match self {
            Self::X => Quat::from_rotation_x(angle),
            Self::Y => Quat::from_rotation_y(angle),
            Self::Z => Quat::from_rotation_z(angle),
        }
    }
}

/// Constant spin (radians/second).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    pub axis: SpinAxis,
    pub speed: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardDef {
    pub position: Vec3,
    /// Overrides [`LayerConfig::knockback_force`].
    #[serde(default)]
    pub knockback_force: Option<f32>,
    #[serde(default)]
    pub spin: Option<Spin>,
    /// Size of the hazard's trigger volume.
    pub half_extents: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpPadDef {
    pub position: Vec3,
    /// Launch speed (meters/second).
    pub force: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowZoneDef {
    pub shape: EntityShape,
    pub transform: Transform,
    /// Speed multiplier while inside, in `(0, 1]`.
    pub speed_factor: f32,
}

// ============================================================================
// Runtime records
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    pub position: Vec3,
    pub collected: bool,
    collider: ColliderHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hazard {
    pub position: Vec3,
    pub knockback_force: Option<f32>,
    pub spin: Option<Spin>,
    /// Current spin angle (radians).
    pub angle: f32,
    body: BodyHandle,
}

impl Hazard {
    pub fn rotation(&self) -> Quat {
        self.spin
            .map_or(Quat::IDENTITY, |spin| spin.axis.rotation(self.angle))
    }
}

/// Visual state of a jump pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadVisual {
    #[default]
    Idle,
    Launched,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JumpPad {
    pub position: Vec3,
    pub force: f32,
    /// Seconds until the pad can fire again.
    pub cooldown: f32,
    pub visual: PadVisual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlowZone {
    pub shape: EntityShape,
    pub transform: Transform,
    pub speed_factor: f32,
}

/// What the layer did during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerReport {
    pub pickups_collected: u32,
    pub knockbacks: u32,
    pub launches: u32,
    /// The level-complete event fired during this update.
    pub completed: bool,
    /// Multiplier handed to the motor.
    pub speed_multiplier: f32,
}

/// Hazard and pickup layer.
#[derive(Debug, Clone, Default)]
pub struct HazardLayer {
    config: LayerConfig,
    pickups: Vec<Pickup>,
    hazards: Vec<Hazard>,
    jump_pads: Vec<JumpPad>,
    slow_zones: Vec<SlowZone>,
    collected: u32,
    completion_sent: bool,
}

impl HazardLayer {
    pub fn new(config: LayerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    pub fn jump_pads(&self) -> &[JumpPad] {
        &self.jump_pads
    }

    pub fn slow_zones(&self) -> &[SlowZone] {
        &self.slow_zones
    }

    /// Pickups collected so far.
    pub fn collected(&self) -> u32 {
        self.collected
    }

    pub fn total_pickups(&self) -> u32 {
        self.pickups.len() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.completion_sent
    }

    // ========================================================================
    // Registration
    // ========================================================================

    pub fn add_pickup(
        &mut self,
        world: &mut PhysicsWorld,
        position: Vec3,
    ) -> Result<usize, PhysicsError> {
        let index = self.pickups.len();
        let collider = world.create_collider(
            ColliderDesc::ball(self.config.pickup_radius)
                .translation(position)
                .contents(ContentFlags::PICKUP)
                .sensor(true)
                .user_data(index as u64),
            None,
        )?;
        self.pickups.push(Pickup {
            position,
            collected: false,
            collider,
        });
        Ok(index)
    }

    pub fn add_hazard(
        &mut self,
        world: &mut PhysicsWorld,
        def: &HazardDef,
    ) -> Result<usize, PhysicsError> {
        let index = self.hazards.len();
        let body = world.create_body(BodyDesc::kinematic_position_based().translation(def.position));
        world.create_collider(
            ColliderDesc::new(ColliderShape::cuboid(def.half_extents))
                .contents(ContentFlags::HAZARD)
                .sensor(true)
                .user_data(index as u64),
            Some(body),
        )?;
        self.hazards.push(Hazard {
            position: def.position,
            knockback_force: def.knockback_force,
            spin: def.spin,
            angle: 0.0,
            body,
        });
        Ok(index)
    }

    pub fn add_jump_pad(
        &mut self,
        world: &mut PhysicsWorld,
        def: &JumpPadDef,
    ) -> Result<usize, PhysicsError> {
        let index = self.jump_pads.len();
        let body = world.create_body(BodyDesc::fixed().translation(def.position));
        world.create_collider(
            ColliderDesc::cylinder(0.25, 1.0)
                .contents(ContentFlags::JUMP_PAD)
                .sensor(true)
                .user_data(index as u64),
            Some(body),
        )?;
        self.jump_pads.push(JumpPad {
            position: def.position,
            force: def.force,
            cooldown: 0.0,
            visual: PadVisual::Idle,
        });
        Ok(index)
    }

    pub fn add_slow_zone(
        &mut self,
        world: &mut PhysicsWorld,
        def: &SlowZoneDef,
    ) -> Result<usize, PhysicsError> {
        let index = self.slow_zones.len();
        let body = world.create_body(
            BodyDesc::fixed()
                .translation(def.transform.translation)
                .rotation(def.transform.rotation()),
        );
        world.create_collider(
            ColliderDesc::new(def.shape.to_collider_shape())
                .contents(ContentFlags::MUD)
                .sensor(true)
                .user_data(index as u64),
            Some(body),
        )?;
        self.slow_zones.push(SlowZone {
            shape: def.shape,
            transform: def.transform,
            speed_factor: def.speed_factor,
        });
        Ok(index)
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Run all proximity checks against the player's committed position.
    ///
    /// Does nothing while the player has no body.
    pub fn update(
        &mut self,
        dt: f32,
        motor: &mut CharacterMotor,
        world: &mut PhysicsWorld,
        events: &mut dyn LevelEvents,
    ) -> Result<LayerReport, PhysicsError> {
        let mut report = LayerReport {
            speed_multiplier: motor.state().speed_multiplier,
            ..LayerReport::default()
        };
        let Some(feet) = motor.position() else {
            return Ok(report);
        };
        let player = feet + Vec3::Y * motor.config().half_height;

        self.spin_hazards(world, dt)?;

        // Pickups
        for index in 0..self.pickups.len() {
            let pickup = &self.pickups[index];
            if !pickup.collected && player.distance(pickup.position) < self.config.pickup_radius {
                let newly = self.collect(index, world, events)?;
                if newly {
                    report.pickups_collected += 1;
                }
            }
        }
        report.completed = report.pickups_collected > 0 && self.completion_sent;

        // Hazards
        for hazard in &self.hazards {
            if player.distance(hazard.position) >= self.config.hazard_radius {
                continue;
            }
            let away = player - hazard.position;
            if away.length_squared() < 1e-12 {
                continue;
            }
            let force = hazard.knockback_force.unwrap_or(self.config.knockback_force);
            motor.apply_knockback(away.normalize(), force);
            report.knockbacks += 1;
            log::debug!("hazard at {:?} hit the player", hazard.position);
        }

        // Jump pads
        for pad in &mut self.jump_pads {
            if pad.cooldown > 0.0 {
                pad.cooldown -= dt;
            }
            let inside = player.distance(pad.position) < self.config.jump_pad_radius;
            if inside && pad.cooldown <= 0.0 {
                motor.launch(pad.force);
                pad.cooldown = self.config.jump_pad_cooldown;
                pad.visual = PadVisual::Launched;
                report.launches += 1;
                log::debug!("jump pad at {:?} launched the player", pad.position);
            } else if !inside {
                pad.visual = PadVisual::Idle;
            }
        }

        // Slow zones
        let target = self
            .slow_zones
            .iter()
            .filter(|zone| zone.shape.contains(&zone.transform, player))
            .map(|zone| zone.speed_factor)
            .fold(1.0_f32, f32::min);
        let current = motor.state().speed_multiplier;
        let blend = 1.0 - (-self.config.slow_blend_rate * dt).exp();
        let mut next = current + (target - current) * blend;
        if (target - next).abs() < BLEND_EPSILON {
            next = target;
        }
        motor.set_speed_multiplier(next);
        report.speed_multiplier = motor.state().speed_multiplier;

        Ok(report)
    }

    /// Collect a pickup. Returns `false` if it was already collected.
    ///
    /// Completion fires through [`LevelEvents::on_all_collected`] the first
    /// time every pickup has been collected, never again afterwards.
    pub fn collect(
        &mut self,
        index: usize,
        world: &mut PhysicsWorld,
        events: &mut dyn LevelEvents,
    ) -> Result<bool, PhysicsError> {
        let Some(pickup) = self.pickups.get_mut(index) else {
            return Ok(false);
        };
        if pickup.collected {
            return Ok(false);
        }
        pickup.collected = true;
        world.set_collider_enabled(pickup.collider, false)?;

        self.collected += 1;
        log::info!(
            "pickup {index} collected ({}/{})",
            self.collected,
            self.pickups.len()
        );
        events.on_pickup_collected(self.collected);

        if !self.completion_sent && self.collected as usize == self.pickups.len() {
            self.completion_sent = true;
            log::info!("all pickups collected");
            events.on_all_collected();
        }
        Ok(true)
    }

    fn spin_hazards(&mut self, world: &mut PhysicsWorld, dt: f32) -> Result<(), PhysicsError> {
        for hazard in &mut self.hazards {
            if let Some(spin) = hazard.spin {
                hazard.angle = (hazard.angle + spin.speed * dt) % std::f32::consts::TAU;
                world.set_next_kinematic_rotation(hazard.body, hazard.rotation())?;
            }
        }
        Ok(())
    }
}
