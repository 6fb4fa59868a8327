//! Slide move algorithm for collision response.
//!
//! This is the classic Quake slide move, working on displacements instead
//! of velocities and extended with slope rules: gentle slopes hold the
//! character, steeper walkable slopes let it slide, anything steeper than
//! the climb limit acts as a wall.

use glam::Vec3;

use crate::collision::{BodyKind, ColliderHandle, ColliderShape, PhysicsWorld, QueryFilter};

use super::config::{AutostepConfig, ControllerConfig};

/// Maximum number of collision planes to track during slide move.
const MAX_CLIP_PLANES: usize = 5;

/// Displacements shorter than this are considered done.
const MIN_MOVE_SQ: f32 = 1e-10;

/// Clip velocity against a surface normal.
///
/// This removes the component of velocity going into the surface and
/// optionally adds a small "overbounce" to prevent sticking.
pub fn clip_velocity(velocity: Vec3, normal: Vec3, overbounce: f32) -> Vec3 {
    // Calculate how much velocity is going into the surface
    let backoff = velocity.dot(normal);

    // Adjust based on whether we're moving into or away from surface
    let adjusted_backoff = if backoff < 0.0 {
        backoff * overbounce
    } else {
        backoff / overbounce
    };

    // Remove the into-surface component
    velocity - normal * adjusted_backoff
}

/// Everything a slide needs besides the position.
pub(crate) struct SlideContext<'a> {
    pub world: &'a PhysicsWorld,
    /// Character shape, already grown by the controller offset.
    pub shape: &'a ColliderShape,
    pub filter: QueryFilter,
    pub config: &'a ControllerConfig,
}

/// What a slide ran into.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SlideOutcome {
    /// Something cut the move short.
    pub blocked: bool,
    /// A surface too steep to climb was hit.
    pub hit_wall: bool,
    /// Collider of the last wall that was hit.
    pub wall_collider: Option<ColliderHandle>,
    /// A downward-facing surface was hit.
    pub hit_ceiling: bool,
    /// The shape could not move at all.
    pub stuck: bool,
}

impl SlideOutcome {
    fn record(&mut self, normal: Vec3, collider: Option<ColliderHandle>, config: &ControllerConfig) {
        self.blocked = true;
        if normal.dot(config.up) < -0.1 {
            self.hit_ceiling = true;
        } else if !config.is_walkable(normal) {
            self.hit_wall = true;
            self.wall_collider = collider;
        }
    }
}

/// Remove the part of `displacement` going into a surface, honoring slope limits.
pub(crate) fn clip_against_surface(
    displacement: Vec3,
    normal: Vec3,
    config: &ControllerConfig,
) -> Vec3 {
    let up = config.up;
    let overbounce = config.overbounce;
    let vertical = up * displacement.dot(up);
    let horizontal = displacement - vertical;
    let angle = config.slope_angle(normal);

    if normal.dot(up) < 0.0 {
        // Ceiling or overhang
        return clip_velocity(displacement, normal, overbounce);
    }

    if angle <= config.min_slope_slide_angle {
        // Gentle slope: walking climbs it, gravity alone does not slide
        if displacement.dot(up) < 0.0 {
            return clip_velocity(horizontal, normal, overbounce);
        }
        return clip_velocity(displacement, normal, overbounce);
    }

    if angle <= config.max_slope_climb_angle {
        return clip_velocity(displacement, normal, overbounce);
    }

    // Too steep: horizontal motion sees a vertical wall so it can't climb
    let wall = (normal - up * normal.dot(up)).normalize_or_zero();
    let horizontal = if wall == Vec3::ZERO {
        horizontal
    } else {
        clip_velocity(horizontal, wall, overbounce)
    };
    let vertical = if displacement.dot(up) < 0.0 {
        clip_velocity(vertical, normal, overbounce)
    } else {
        vertical
    };
    horizontal + vertical
}

/// Perform a slide move through the world.
///
/// Traces the shape along the displacement, clips the remainder against
/// each surface hit and continues, handling creases between two surfaces.
pub(crate) fn slide_move(
    ctx: &SlideContext<'_>,
    position: &mut Vec3,
    displacement: Vec3,
) -> SlideOutcome {
    let mut outcome = SlideOutcome::default();
    let mut remaining = displacement;
    let mut planes: [Vec3; MAX_CLIP_PLANES] = [Vec3::ZERO; MAX_CLIP_PLANES];
    let mut num_planes = 0;

    for _ in 0..ctx.config.max_slide_iterations {
        if remaining.length_squared() < MIN_MOVE_SQ {
            break;
        }

        let trace = ctx
            .world
            .trace(*position, *position + remaining, ctx.shape, ctx.filter);

        if trace.fraction > 0.0 {
            *position = trace.end_position;
        }

        // If we made the full distance, we're done
        if !trace.hit_something() {
            break;
        }

        if trace.all_solid {
            outcome.blocked = true;
            outcome.stuck = true;
            break;
        }

        let normal = trace.normal_or_up();
        outcome.record(normal, trace.hit_collider, ctx.config);

        remaining *= 1.0 - trace.fraction;
        let unclipped = remaining;
        remaining = clip_against_surface(remaining, normal, ctx.config);

        // Check the new direction against every earlier plane
        let mut crease = None;
        for plane in &planes[..num_planes] {
            if remaining.dot(*plane) < -0.001 {
                crease = Some(*plane);
                break;
            }
        }

        if num_planes < MAX_CLIP_PLANES {
            planes[num_planes] = normal;
            num_planes += 1;
        }

        if let Some(other) = crease {
            // Slide along the intersection of the two planes
            let direction = other.cross(normal).normalize_or_zero();
            remaining = direction * unclipped.dot(direction);

            // If still no good, just stop
            if planes[..num_planes]
                .iter()
                .any(|plane| remaining.dot(*plane) < -0.001)
            {
                break;
            }
        }
    }

    outcome
}

/// Perform a slide move that can step onto ledges.
///
/// If the plain slide is stopped by a wall, try again lifted by the step
/// height, then drop back down. The stepped result is used when it lands
/// on walkable ground, gets further horizontally and leaves room on top.
pub(crate) fn step_slide_move(
    ctx: &SlideContext<'_>,
    position: &mut Vec3,
    displacement: Vec3,
    step: &AutostepConfig,
) -> (SlideOutcome, bool) {
    let start = *position;
    let up = ctx.config.up;

    // First, try normal slide move
    let outcome = slide_move(ctx, position, displacement);
    if !outcome.hit_wall || outcome.stuck {
        return (outcome, false);
    }

    if !step.include_dynamic_bodies && is_dynamic(ctx.world, outcome.wall_collider) {
        return (outcome, false);
    }

    let horizontal = displacement - up * displacement.dot(up);
    if horizontal.length_squared() < MIN_MOVE_SQ {
        return (outcome, false);
    }

    let plain_progress = horizontal_distance(*position - start, up);

    // Try stepping up
    let up_trace = ctx
        .world
        .trace(start, start + up * step.max_height, ctx.shape, ctx.filter);
    if up_trace.all_solid {
        return (outcome, false);
    }
    let lifted = (up_trace.end_position - start).dot(up);

    // Try moving horizontally from the stepped-up position
    let mut stepped = up_trace.end_position;
    let stepped_outcome = slide_move(ctx, &mut stepped, horizontal);

    // Step back down, covering the lift plus any fall this move wanted
    let drop = lifted + (-displacement.dot(up)).max(0.0) + ctx.config.offset;
    let down_trace = ctx
        .world
        .trace(stepped, stepped - up * drop, ctx.shape, ctx.filter);

    let Some(normal) = down_trace.hit_normal else {
        return (outcome, false);
    };
    if down_trace.all_solid || !ctx.config.is_walkable(normal) {
        return (outcome, false);
    }

    let landed = down_trace.end_position;
    if horizontal_distance(landed - start, up) <= plain_progress + 1e-4 {
        return (outcome, false);
    }

    // The ledge must leave room on top to keep going
    let ahead = stepped + horizontal.normalize() * step.min_width;
    if ctx.world.intersects(ahead, ctx.shape, ctx.filter) {
        return (outcome, false);
    }

    log::trace!("autostep by {:.3}", (landed - start).dot(up));
    *position = landed;
    (stepped_outcome, true)
}

fn horizontal_distance(delta: Vec3, up: Vec3) -> f32 {
    (delta - up * delta.dot(up)).length()
}

fn is_dynamic(world: &PhysicsWorld, collider: Option<ColliderHandle>) -> bool {
    collider
        .and_then(|handle| world.collider(handle))
        .and_then(|collider| collider.parent())
        .and_then(|body| world.body(body))
        .is_some_and(|body| body.kind() == BodyKind::Dynamic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ColliderDesc;

    const PLAYER: ColliderShape = ColliderShape::Capsule {
        half_height: 0.91,
        radius: 0.51,
    };

    fn floor_world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world
            .create_collider(
                ColliderDesc::cuboid(50.0, 0.5, 50.0).translation(Vec3::new(0.0, -0.5, 0.0)),
                None,
            )
            .unwrap();
        world
    }

    #[test]
    fn test_clip_velocity_wall() {
        // Moving into a wall on the +X side
        let velocity = Vec3::new(10.0, 0.0, 5.0);
        let wall_normal = Vec3::new(-1.0, 0.0, 0.0); // Wall facing -X

        let clipped = clip_velocity(velocity, wall_normal, 1.0);

        // X component should be zeroed, Z unchanged
        assert!(clipped.x.abs() < 0.01);
        assert!((clipped.z - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_gentle_slope_holds_against_gravity() {
        let config = ControllerConfig::default();
        // 20 degree slope
        let normal = Vec3::new(-0.342, 0.94, 0.0).normalize();

        let clipped = clip_against_surface(Vec3::new(0.0, -0.2, 0.0), normal, &config);
        assert!(clipped.length() < 1e-4, "slid by {clipped:?}");
    }

    #[test]
    fn test_slippery_slope_slides() {
        let config = ControllerConfig::default();
        // 50 degree slope rising toward +X
        let normal = Vec3::new(-0.766, 0.643, 0.0).normalize();

        let clipped = clip_against_surface(Vec3::new(0.0, -0.2, 0.0), normal, &config);
        assert!(clipped.x < 0.0, "should slide downhill, got {clipped:?}");
        assert!(clipped.y < 0.0);
    }

    #[test]
    fn test_steep_face_cannot_be_climbed() {
        let config = ControllerConfig::default();
        // 70 degree face rising toward +X
        let normal = Vec3::new(-0.94, 0.342, 0.0).normalize();

        let clipped = clip_against_surface(Vec3::new(0.1, 0.0, 0.0), normal, &config);
        assert!(clipped.y <= 1e-6, "climbed a steep face: {clipped:?}");
        assert!(clipped.x.abs() < 1e-3);
    }

    #[test]
    fn test_slide_move_no_collision() {
        let world = PhysicsWorld::new();
        let config = ControllerConfig::default();
        let ctx = SlideContext {
            world: &world,
            shape: &PLAYER,
            filter: QueryFilter::solid(),
            config: &config,
        };

        let mut position = Vec3::new(0.0, 2.0, 0.0);
        let outcome = slide_move(&ctx, &mut position, Vec3::new(5.0, 0.0, 0.0));

        assert!(!outcome.blocked);
        assert!((position.x - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_slide_move_along_wall() {
        let mut world = floor_world();

        // Wall face at x=5
        world
            .create_collider(
                ColliderDesc::cuboid(0.5, 2.0, 10.0).translation(Vec3::new(5.5, 2.0, 0.0)),
                None,
            )
            .unwrap();

        let config = ControllerConfig::default();
        let ctx = SlideContext {
            world: &world,
            shape: &PLAYER,
            filter: QueryFilter::solid(),
            config: &config,
        };

        let mut position = Vec3::new(0.0, 0.92, 0.0);
        let outcome = slide_move(&ctx, &mut position, Vec3::new(10.0, 0.0, 5.0));

        assert!(outcome.blocked);
        assert!(outcome.hit_wall);
        assert!(position.x < 5.0 - 0.5, "position x={} went into the wall", position.x);
        assert!(position.z > 1.0, "should keep sliding along z, got {}", position.z);
    }

    #[test]
    fn test_step_slide_move_climbs_low_ledge() {
        let mut world = floor_world();

        // 0.3 m ledge starting at x=2
        world
            .create_collider(
                ColliderDesc::cuboid(5.0, 0.15, 5.0).translation(Vec3::new(7.0, 0.15, 0.0)),
                None,
            )
            .unwrap();

        let config = ControllerConfig::default();
        let step = AutostepConfig::default();
        let ctx = SlideContext {
            world: &world,
            shape: &PLAYER,
            filter: QueryFilter::solid(),
            config: &config,
        };

        let mut position = Vec3::new(0.0, 0.92, 0.0);
        let mut stepped_any = false;
        for _ in 0..60 {
            let (_, stepped) = step_slide_move(&ctx, &mut position, Vec3::new(0.1, 0.0, 0.0), &step);
            stepped_any |= stepped;
        }

        assert!(stepped_any);
        assert!(position.x > 3.0, "stuck at x={}", position.x);
        assert!(position.y > 0.92 + 0.2, "did not climb, y={}", position.y);
    }

    #[test]
    fn test_step_slide_move_blocked_by_tall_wall() {
        let mut world = floor_world();
        world
            .create_collider(
                ColliderDesc::cuboid(0.5, 1.0, 5.0).translation(Vec3::new(2.5, 1.0, 0.0)),
                None,
            )
            .unwrap();

        let config = ControllerConfig::default();
        let step = AutostepConfig::default();
        let ctx = SlideContext {
            world: &world,
            shape: &PLAYER,
            filter: QueryFilter::solid(),
            config: &config,
        };

        let mut position = Vec3::new(0.0, 0.92, 0.0);
        for _ in 0..40 {
            step_slide_move(&ctx, &mut position, Vec3::new(0.1, 0.0, 0.0), &step);
        }

        assert!(position.x < 2.0 - 0.5 + 0.01);
        assert!(position.y < 0.92 + 0.05);
    }
}
