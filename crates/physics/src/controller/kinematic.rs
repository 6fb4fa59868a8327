//! The character controller proper.

use glam::Vec3;

use crate::collision::{ColliderHandle, ColliderShape, PhysicsWorld, QueryFilter};
use crate::error::PhysicsError;

use super::config::ControllerConfig;
use super::slide_move::{slide_move, step_slide_move, SlideContext};

/// Result of the last controller query.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveOutcome {
    /// Corrected displacement of the collider.
    pub translation: Vec3,
    /// Whether the collider ended the move on walkable ground.
    pub grounded: bool,
    /// Normal of the ground below, when grounded.
    pub ground_normal: Option<Vec3>,
    /// Collider the character is standing on, when grounded.
    pub ground_collider: Option<ColliderHandle>,
    /// An upward move was stopped by a ceiling.
    pub hit_ceiling: bool,
    /// The move climbed a ledge.
    pub stepped: bool,
    /// The move was pulled down onto ground.
    pub snapped: bool,
}

/// Ground found below a position.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GroundHit {
    position: Vec3,
    normal: Vec3,
    collider: Option<ColliderHandle>,
}

/// Kinematic character controller.
///
/// Holds configuration and the result of the last query, in the manner of
/// `computedMovement` / `computedGrounded` of typical engines.
#[derive(Debug, Clone, Default)]
pub struct CharacterController {
    config: ControllerConfig,
    last: MoveOutcome,
}

impl CharacterController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            last: MoveOutcome::default(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ControllerConfig {
        &mut self.config
    }

    /// Corrected displacement from the last [`Self::compute_collider_movement`].
    pub fn computed_movement(&self) -> Vec3 {
        self.last.translation
    }

    /// Grounded state from the last query.
    pub fn computed_grounded(&self) -> bool {
        self.last.grounded
    }

    /// Everything the last query found.
    pub fn computed_outcome(&self) -> &MoveOutcome {
        &self.last
    }

    /// Probe for ground below a collider without moving it.
    ///
    /// Updates the grounded state returned by [`Self::computed_grounded`].
    pub fn query_grounded(
        &mut self,
        world: &PhysicsWorld,
        collider: ColliderHandle,
    ) -> Result<bool, PhysicsError> {
        self.query_grounded_at(world, collider, Vec3::ZERO)
    }

    /// Like [`Self::query_grounded`], probing from the collider shifted by `offset`.
    ///
    /// Used when the ground has already moved this tick and the collider is
    /// about to follow it.
    pub fn query_grounded_at(
        &mut self,
        world: &PhysicsWorld,
        collider: ColliderHandle,
        offset: Vec3,
    ) -> Result<bool, PhysicsError> {
        let (position, shape, filter) = self.prepare(world, collider)?;
        let ground = self.probe_ground(world, position + offset, &shape, filter);

        self.last.grounded = ground.is_some();
        self.last.ground_normal = ground.map(|g| g.normal);
        self.last.ground_collider = ground.and_then(|g| g.collider);
        Ok(self.last.grounded)
    }

    /// Compute the largest legal displacement of `collider` toward `desired`.
    ///
    /// The collider is not moved. The returned displacement is also kept as
    /// [`Self::computed_movement`] together with the post-move grounded state.
    pub fn compute_collider_movement(
        &mut self,
        world: &PhysicsWorld,
        collider: ColliderHandle,
        desired: Vec3,
    ) -> Result<Vec3, PhysicsError> {
        let (origin, shape, filter) = self.prepare(world, collider)?;
        let config = &self.config;
        let up = config.up;
        let was_grounded = self.last.grounded;
        let rising = desired.dot(up) > 0.0;

        let ctx = SlideContext {
            world,
            shape: &shape,
            filter,
            config,
        };

        // Get out of anything that moved into us first
        let mut position = origin;
        if world.intersects(position, &shape, filter) {
            position = world.resolve_penetration(position, &shape, filter);
        }

        let (slide, stepped) = match config.autostep {
            Some(step) if was_grounded => step_slide_move(&ctx, &mut position, desired, &step),
            _ => (slide_move(&ctx, &mut position, desired), false),
        };

        let mut snapped = false;
        if let Some(snap) = config.snap_to_ground {
            if was_grounded && !rising && !slide.hit_ceiling {
                if let Some(ground) = self.cast_ground(world, position, snap, &shape, filter) {
                    snapped = (ground.position - position).length_squared() > 1e-8;
                    position = ground.position;
                }
            }
        }

        // Land flush on whatever the probe found, so the next tick starts in contact
        let ground = self.probe_ground(world, position, &shape, filter);
        if let Some(hit) = ground {
            if !rising && !slide.hit_ceiling {
                snapped |= (hit.position - position).length_squared() > 1e-8;
                position = hit.position;
            }
        }
        let translation = position - origin;

        self.last = MoveOutcome {
            translation,
            grounded: ground.is_some(),
            ground_normal: ground.map(|g| g.normal),
            ground_collider: ground.and_then(|g| g.collider),
            hit_ceiling: slide.hit_ceiling && rising,
            stepped,
            snapped,
        };

        log::trace!(
            "controller: desired {desired:?} -> {translation:?} (grounded={}, stepped={stepped}, snapped={snapped})",
            self.last.grounded
        );

        Ok(translation)
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    /// Current center, skin-inflated shape and filter for a collider.
    fn prepare(
        &self,
        world: &PhysicsWorld,
        handle: ColliderHandle,
    ) -> Result<(Vec3, ColliderShape, QueryFilter), PhysicsError> {
        let collider = world
            .collider(handle)
            .ok_or(PhysicsError::UnknownCollider(handle))?;
        if !collider.is_enabled() {
            return Err(PhysicsError::DisabledCollider(handle));
        }
        let position = world
            .collider_translation(handle)
            .ok_or(PhysicsError::UnknownCollider(handle))?;

        let shape = collider.shape().inflated(self.config.offset);
        let filter = QueryFilter::solid()
            .mask(self.config.mask)
            .exclude_collider(handle);

        Ok((position, shape, filter))
    }

    /// Walkable ground within the probe distance.
    fn probe_ground(
        &self,
        world: &PhysicsWorld,
        position: Vec3,
        shape: &ColliderShape,
        filter: QueryFilter,
    ) -> Option<GroundHit> {
        self.cast_ground(world, position, self.config.ground_probe_distance, shape, filter)
    }

    /// Walkable ground within `distance` below `position`.
    fn cast_ground(
        &self,
        world: &PhysicsWorld,
        position: Vec3,
        distance: f32,
        shape: &ColliderShape,
        filter: QueryFilter,
    ) -> Option<GroundHit> {
        let trace = world.trace(position, position - self.config.up * distance, shape, filter);
        let normal = trace.hit_normal?;
        if !trace.hit_something() || !self.config.is_walkable(normal) {
            return None;
        }
        Some(GroundHit {
            position: trace.end_position,
            normal,
            collider: trace.hit_collider,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_6;

    use glam::Quat;

    use super::*;
    use crate::collision::{BodyDesc, ColliderDesc};

    const DT: f32 = 1.0 / 60.0;

    struct Rig {
        world: PhysicsWorld,
        body: crate::collision::BodyHandle,
        collider: ColliderHandle,
        controller: CharacterController,
    }

    impl Rig {
        fn new(world: PhysicsWorld, at: Vec3) -> Self {
            let mut world = world;
            let body = world.create_body(BodyDesc::kinematic_position_based().translation(at));
            let collider = world
                .create_collider(ColliderDesc::capsule(0.9, 0.5), Some(body))
                .unwrap();
            let controller = world.create_character_controller(0.01);
            Self {
                world,
                body,
                collider,
                controller,
            }
        }

        fn center(&self) -> Vec3 {
            self.world.body(self.body).unwrap().translation()
        }

        fn advance(&mut self, desired: Vec3) -> Vec3 {
            let moved = self
                .controller
                .compute_collider_movement(&self.world, self.collider, desired)
                .unwrap();
            let next = self.center() + moved;
            self.world
                .set_next_kinematic_translation(self.body, next)
                .unwrap();
            self.world.step(DT);
            moved
        }
    }

    fn floor() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world
            .create_collider(
                ColliderDesc::cuboid(50.0, 0.5, 50.0).translation(Vec3::new(0.0, -0.5, 0.0)),
                None,
            )
            .unwrap();
        world
    }

    fn with_ramp(angle: f32) -> PhysicsWorld {
        let mut world = floor();
        // Ramp rising toward +X, starting near x=2
        let body = world.create_body(
            BodyDesc::fixed()
                .translation(Vec3::new(6.0, 0.0, 0.0))
                .rotation(Quat::from_rotation_z(angle)),
        );
        world
            .create_collider(ColliderDesc::cuboid(4.0, 0.1, 4.0), Some(body))
            .unwrap();
        world
    }

    #[test]
    fn test_falls_and_lands_on_floor() {
        let mut rig = Rig::new(floor(), Vec3::new(0.0, 3.0, 0.0));

        let mut velocity = 0.0_f32;
        for _ in 0..120 {
            if !rig.controller.computed_grounded() {
                velocity -= 19.62 * DT;
            }
            rig.advance(Vec3::new(0.0, velocity * DT, 0.0));
            if rig.controller.computed_grounded() {
                velocity = 0.0;
            }
        }

        assert!(rig.controller.computed_grounded());
        assert!((rig.center().y - 0.91).abs() < 0.02, "y={}", rig.center().y);
    }

    #[test]
    fn test_landing_rests_flush_on_floor() {
        // Falling slowly enough that the move stops just short of the floor
        let mut rig = Rig::new(floor(), Vec3::new(0.0, 0.975, 0.0));
        assert!(!rig.controller.query_grounded(&rig.world, rig.collider).unwrap());

        rig.advance(Vec3::new(0.0, -0.02, 0.0));

        let outcome = rig.controller.computed_outcome();
        assert!(outcome.grounded);
        assert!(outcome.snapped);
        assert!((rig.center().y - 0.91).abs() < 1e-3, "y={}", rig.center().y);

        // Starting in contact, the probe still sees the floor next tick
        assert!(rig.controller.query_grounded(&rig.world, rig.collider).unwrap());
    }

    #[test]
    fn test_rising_move_is_not_pulled_down() {
        let mut rig = Rig::new(floor(), Vec3::new(0.0, 0.91, 0.0));
        rig.controller.query_grounded(&rig.world, rig.collider).unwrap();

        rig.advance(Vec3::new(0.0, 0.02, 0.0));

        assert!((rig.center().y - 0.93).abs() < 1e-3, "y={}", rig.center().y);
        assert!(!rig.controller.computed_outcome().snapped);
    }

    #[test]
    fn test_query_grounded_without_moving() {
        let mut rig = Rig::new(floor(), Vec3::new(0.0, 0.915, 0.0));
        assert!(rig.controller.query_grounded(&rig.world, rig.collider).unwrap());
        assert!(rig.controller.computed_outcome().ground_collider.is_some());

        rig.world
            .set_translation(rig.body, Vec3::new(0.0, 2.0, 0.0))
            .unwrap();
        assert!(!rig.controller.query_grounded(&rig.world, rig.collider).unwrap());
    }

    #[test]
    fn test_wall_blocks_and_never_overlaps() {
        let mut world = floor();
        world
            .create_collider(
                ColliderDesc::cuboid(0.1, 2.0, 5.0).translation(Vec3::new(2.0, 2.0, 0.0)),
                None,
            )
            .unwrap();
        let mut rig = Rig::new(world, Vec3::new(0.0, 0.92, 0.0));

        // A single huge step that would cross the wall
        rig.advance(Vec3::new(10.0, 0.0, 0.0));

        let wall_filter = QueryFilter::solid().exclude_collider(rig.collider);
        assert!(rig.center().x < 2.0 - 0.1 - 0.5);
        assert!(!rig.world.intersects(
            rig.center(),
            &ColliderShape::capsule(0.9, 0.5),
            wall_filter
        ));
    }

    #[test]
    fn test_walks_up_gentle_ramp() {
        let mut rig = Rig::new(with_ramp(FRAC_PI_6), Vec3::new(0.0, 0.92, 0.0));
        rig.controller.query_grounded(&rig.world, rig.collider).unwrap();

        for _ in 0..120 {
            rig.advance(Vec3::new(5.0 * DT, 0.0, 0.0));
        }

        assert!(rig.center().y > 1.5, "did not climb, y={}", rig.center().y);
        assert!(rig.controller.computed_grounded());
    }

    #[test]
    fn test_steep_ramp_is_not_ground() {
        // 70 degrees, steeper than the 60 degree climb limit
        let mut rig = Rig::new(with_ramp(1.22), Vec3::new(6.0, 6.0, 0.0));

        let mut velocity = 0.0_f32;
        let mut ever_grounded_high = false;
        for _ in 0..60 {
            if !rig.controller.computed_grounded() {
                velocity -= 19.62 * DT;
            }
            rig.advance(Vec3::new(0.0, velocity * DT, 0.0));
            if rig.controller.computed_grounded() {
                velocity = 0.0;
                if rig.center().y > 1.5 {
                    ever_grounded_high = true;
                }
            }
        }

        assert!(!ever_grounded_high, "stuck to a steep face");
    }

    #[test]
    fn test_snaps_down_small_drop_while_walking() {
        let mut world = floor();
        // Raised slab ending at x=1 with its top at 0.05
        world
            .create_collider(
                ColliderDesc::cuboid(3.0, 0.025, 3.0).translation(Vec3::new(-2.0, 0.025, 0.0)),
                None,
            )
            .unwrap();
        let mut rig = Rig::new(world, Vec3::new(-1.0, 0.965, 0.0));
        assert!(rig.controller.query_grounded(&rig.world, rig.collider).unwrap());

        for _ in 0..40 {
            rig.advance(Vec3::new(5.0 * DT, 0.0, 0.0));
            assert!(rig.controller.computed_grounded(), "left the ground at {:?}", rig.center());
        }
        assert!(rig.center().x > 1.5);
        assert!((rig.center().y - 0.91).abs() < 0.02);
    }

    #[test]
    fn test_unknown_collider_is_an_error() {
        let world = floor();
        let mut controller = world.create_character_controller(0.01);
        let result =
            controller.compute_collider_movement(&world, ColliderHandle(42), Vec3::X);
        assert!(matches!(result, Err(PhysicsError::UnknownCollider(_))));
    }
}
