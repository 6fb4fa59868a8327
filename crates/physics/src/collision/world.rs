//! Physics world containing every body and collider of a level.
//!
//! The world stores bodies and colliders in handle-indexed slots and answers
//! the swept and overlap queries the character controller is built on.
//! Collider poses are always derived from their parent body at query time,
//! so a body moved by its owner is seen by the very next query.

use glam::{Quat, Vec3};
use parry3d::math::{Isometry, Real};
use parry3d::na::{Quaternion, Translation3, UnitQuaternion};
use parry3d::query::{contact, intersection_test};
use parry3d::shape::SharedShape;

use super::body::{BodyDesc, BodyHandle, BodyKind, RigidBody};
use super::flags::ContentFlags;
use super::shape::{Collider, ColliderDesc, ColliderHandle, ColliderShape};
use super::trace::{QueryFilter, TraceResult};
use crate::controller::{CharacterController, ControllerConfig};
use crate::error::PhysicsError;

/// Binary search refinement steps once a blocked sample is found.
/// 12 iterations gives ~0.025% precision of the sample interval.
const REFINE_ITERATIONS: usize = 12;

/// Lower bound on the march step so tiny shapes don't explode the sample count.
const MIN_SAMPLE_STEP: f32 = 0.01;

/// Passes used to push a shape out of overlapping geometry.
const DEPENETRATION_PASSES: usize = 4;

/// Extra distance added when pushing out of geometry.
const DEPENETRATION_EPSILON: f32 = 0.001;

/// The physics world.
///
/// Supports:
/// - Fixed, kinematic and dynamic bodies
/// - Cuboid, ball, cylinder and capsule colliders, solid or sensor
/// - Swept traces, overlap tests and penetration resolution
#[derive(Debug, Default)]
pub struct PhysicsWorld {
    bodies: Vec<Option<RigidBody>>,
    colliders: Vec<Option<Collider>>,
    /// Number of completed steps.
    steps: u64,
}

impl PhysicsWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            colliders: Vec::new(),
            steps: 0,
        }
    }

    // ========================================================================
    // Bodies
    // ========================================================================

    /// Add a body to the world.
    pub fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Some(RigidBody::from_desc(desc)));
        handle
    }

    /// Remove a body together with every collider attached to it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let body = self.bodies.get_mut(handle.0 as usize)?.take()?;
        for slot in &mut self.colliders {
            if slot.as_ref().is_some_and(|c| c.parent == Some(handle)) {
                *slot = None;
            }
        }
        Some(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.0 as usize)?.as_ref()
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        self.bodies
            .get_mut(handle.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    fn kinematic_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        let body = self.body_mut(handle)?;
        if !body.is_kinematic() {
            return Err(PhysicsError::NotKinematic(handle));
        }
        Ok(body)
    }

    /// Queue a translation for a kinematic body, applied at the next step.
    pub fn set_next_kinematic_translation(
        &mut self,
        handle: BodyHandle,
        translation: Vec3,
    ) -> Result<(), PhysicsError> {
        self.kinematic_mut(handle)?.set_next_translation(translation);
        Ok(())
    }

    /// Queue a rotation for a kinematic body, applied at the next step.
    pub fn set_next_kinematic_rotation(
        &mut self,
        handle: BodyHandle,
        rotation: Quat,
    ) -> Result<(), PhysicsError> {
        self.kinematic_mut(handle)?.set_next_rotation(rotation);
        Ok(())
    }

    /// Move a kinematic body right now.
    ///
    /// Queries issued after this call see the new pose. The displacement is
    /// recorded as the body's frame delta until the next step so characters
    /// standing on it can follow.
    pub fn move_kinematic_body(
        &mut self,
        handle: BodyHandle,
        translation: Vec3,
        rotation: Option<Quat>,
    ) -> Result<(), PhysicsError> {
        self.kinematic_mut(handle)?.move_now(translation, rotation);
        Ok(())
    }

    /// Teleport any body without recording a frame delta.
    pub fn set_translation(
        &mut self,
        handle: BodyHandle,
        translation: Vec3,
    ) -> Result<(), PhysicsError> {
        self.body_mut(handle)?.teleport(translation);
        Ok(())
    }

    /// Set the linear velocity of a dynamic body.
    pub fn set_linvel(&mut self, handle: BodyHandle, linvel: Vec3) -> Result<(), PhysicsError> {
        self.body_mut(handle)?.set_linvel(linvel);
        Ok(())
    }

    /// Advance the world by one step.
    ///
    /// Kinematic bodies take their queued pose, dynamic bodies integrate
    /// their velocity and every frame delta is cleared.
    pub fn step(&mut self, dt: f32) {
        for body in self.bodies.iter_mut().flatten() {
            body.integrate(dt);
            body.clear_frame_delta();
        }
        self.steps += 1;
        log::trace!("physics step {} (dt={dt:.4})", self.steps);
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn body_count(&self) -> usize {
        self.bodies.iter().flatten().count()
    }

    // ========================================================================
    // Colliders
    // ========================================================================

    /// Add a collider, optionally attached to a body.
    pub fn create_collider(
        &mut self,
        desc: ColliderDesc,
        parent: Option<BodyHandle>,
    ) -> Result<ColliderHandle, PhysicsError> {
        if let Some(parent) = parent {
            if self.body(parent).is_none() {
                return Err(PhysicsError::UnknownBody(parent));
            }
        }

        let handle = ColliderHandle(self.colliders.len() as u32);
        self.colliders.push(Some(Collider::new(desc, parent)));
        Ok(handle)
    }

    pub fn remove_collider(&mut self, handle: ColliderHandle) -> Option<Collider> {
        self.colliders.get_mut(handle.0 as usize)?.take()
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle.0 as usize)?.as_ref()
    }

    /// Enable or disable a collider. Disabled colliders are invisible to queries.
    pub fn set_collider_enabled(
        &mut self,
        handle: ColliderHandle,
        enabled: bool,
    ) -> Result<(), PhysicsError> {
        let collider = self
            .colliders
            .get_mut(handle.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(PhysicsError::UnknownCollider(handle))?;
        collider.desc.enabled = enabled;
        Ok(())
    }

    /// World-space center of a collider.
    pub fn collider_translation(&self, handle: ColliderHandle) -> Option<Vec3> {
        let collider = self.collider(handle)?;
        self.collider_pose(collider).map(|(translation, _)| translation)
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.iter().flatten().count()
    }

    /// Create a character controller that keeps `offset` between its
    /// collider and everything else.
    pub fn create_character_controller(&self, offset: f32) -> CharacterController {
        CharacterController::new(ControllerConfig {
            offset,
            ..ControllerConfig::default()
        })
    }

    /// Remove every body and collider.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.colliders.clear();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Sweep a shape from `start` to `end` (shape centers).
    ///
    /// The path is sampled at intervals of half the shape's smallest extent,
    /// so any collider the shape would pass through is found, then the first
    /// blocked interval is refined by binary search.
    pub fn trace(
        &self,
        start: Vec3,
        end: Vec3,
        shape: &ColliderShape,
        filter: QueryFilter,
    ) -> TraceResult {
        let shared = shape.to_shared();
        let started_in_solid = self.overlaps(start, &shared, filter);

        let delta = end - start;
        let distance = delta.length();

        // No movement - just check if position is valid
        if distance < 0.0001 {
            return if started_in_solid {
                let (normal, hit) = self
                    .deepest_contact(start, &shared, filter)
                    .map(|(n, h, c)| (n, Some((h, c))))
                    .unwrap_or((Vec3::Y, None));
                TraceResult {
                    fraction: 0.0,
                    end_position: start,
                    hit_normal: Some(normal),
                    hit_contents: hit.map_or(ContentFlags::SOLID, |(_, c)| c),
                    hit_collider: hit.map(|(h, _)| h),
                    started_in_solid: true,
                    all_solid: true,
                }
            } else {
                TraceResult::no_hit(start)
            };
        }

        let step = (shape.min_extent() * 0.5).max(MIN_SAMPLE_STEP);
        let samples = (distance / step).ceil().max(1.0) as usize;

        let mut lo = 0.0_f32;
        let mut blocked = None;
        for i in 1..=samples {
            let t = i as f32 / samples as f32;
            if self.overlaps(start + delta * t, &shared, filter) {
                blocked = Some(t);
                break;
            }
            lo = t;
        }

        let Some(mut hi) = blocked else {
            return TraceResult {
                started_in_solid,
                ..TraceResult::no_hit(end)
            };
        };

        for _ in 0..REFINE_ITERATIONS {
            let mid = (lo + hi) * 0.5;
            if self.overlaps(start + delta * mid, &shared, filter) {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let direction = delta / distance;
        let penetrating = start + delta * hi;
        let (normal, hit_collider, hit_contents) =
            match self.deepest_contact(penetrating, &shared, filter) {
                Some((normal, handle, contents)) => (normal, Some(handle), contents),
                None => (fallback_normal(direction), None, ContentFlags::SOLID),
            };

        TraceResult {
            fraction: lo,
            end_position: start + delta * lo,
            hit_normal: Some(normal),
            hit_contents,
            hit_collider,
            started_in_solid,
            all_solid: started_in_solid && lo < 0.001,
        }
    }

    /// Check whether a shape centered at `position` overlaps anything.
    pub fn intersects(&self, position: Vec3, shape: &ColliderShape, filter: QueryFilter) -> bool {
        self.overlaps(position, &shape.to_shared(), filter)
    }

    /// Every collider a shape centered at `position` overlaps.
    pub fn intersecting_colliders(
        &self,
        position: Vec3,
        shape: &ColliderShape,
        filter: QueryFilter,
    ) -> Vec<ColliderHandle> {
        let shared = shape.to_shared();
        let iso = to_isometry(position, Quat::IDENTITY);
        self.candidates(filter)
            .filter(|(_, collider, pose)| {
                matches!(
                    intersection_test(&iso, shared.as_ref(), pose, collider.shared.as_ref()),
                    Ok(true)
                )
            })
            .map(|(handle, _, _)| handle)
            .collect()
    }

    /// Push a shape out of overlapping geometry.
    ///
    /// Returns the corrected position.
    pub fn resolve_penetration(
        &self,
        position: Vec3,
        shape: &ColliderShape,
        filter: QueryFilter,
    ) -> Vec3 {
        let shared = shape.to_shared();
        let mut position = position;

        for _ in 0..DEPENETRATION_PASSES {
            let iso = to_isometry(position, Quat::IDENTITY);
            let mut correction = Vec3::ZERO;

            for (_, collider, pose) in self.candidates(filter) {
                if let Ok(Some(hit)) =
                    contact(&iso, shared.as_ref(), &pose, collider.shared.as_ref(), 0.0)
                {
                    // Negative dist means penetration
                    let depth = -hit.dist;
                    if depth > 0.0 {
                        let normal = Vec3::new(hit.normal2.x, hit.normal2.y, hit.normal2.z);
                        correction += normal * (depth + DEPENETRATION_EPSILON);
                    }
                }
            }

            if correction.length_squared() < 1e-10 {
                break;
            }
            position += correction;
        }

        position
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    /// World pose of a collider, derived from its parent body.
    fn collider_pose(&self, collider: &Collider) -> Option<(Vec3, Quat)> {
        match collider.parent {
            Some(parent) => {
                let body = self.body(parent)?;
                let translation =
                    body.translation() + body.rotation() * collider.local_translation();
                Some((translation, body.rotation()))
            }
            None => Some((collider.local_translation(), Quat::IDENTITY)),
        }
    }

    /// Colliders passing the filter, with their current poses.
    fn candidates(
        &self,
        filter: QueryFilter,
    ) -> impl Iterator<Item = (ColliderHandle, &Collider, Isometry<Real>)> + '_ {
        self.colliders
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| {
                let collider = slot.as_ref()?;
                let handle = ColliderHandle(index as u32);

                if !collider.is_enabled()
                    || !filter.mask.intersects(collider.contents())
                    || (filter.exclude_sensors && collider.is_sensor())
                    || filter.exclude_collider == Some(handle)
                {
                    return None;
                }

                if filter.exclude_dynamic {
                    let parent_kind = collider
                        .parent
                        .and_then(|p| self.body(p))
                        .map(RigidBody::kind);
                    if parent_kind == Some(BodyKind::Dynamic) {
                        return None;
                    }
                }

                let (translation, rotation) = self.collider_pose(collider)?;
                Some((handle, collider, to_isometry(translation, rotation)))
            })
    }

    fn overlaps(&self, position: Vec3, shape: &SharedShape, filter: QueryFilter) -> bool {
        let iso = to_isometry(position, Quat::IDENTITY);
        self.candidates(filter).any(|(_, collider, pose)| {
            matches!(
                intersection_test(&iso, shape.as_ref(), &pose, collider.shared.as_ref()),
                Ok(true)
            )
        })
    }

    /// Normal of the deepest contact at `position`, pointing out of the obstacle.
    fn deepest_contact(
        &self,
        position: Vec3,
        shape: &SharedShape,
        filter: QueryFilter,
    ) -> Option<(Vec3, ColliderHandle, ContentFlags)> {
        let iso = to_isometry(position, Quat::IDENTITY);
        let mut deepest: Option<(f32, Vec3, ColliderHandle, ContentFlags)> = None;

        for (handle, collider, pose) in self.candidates(filter) {
            if let Ok(Some(hit)) =
                contact(&iso, shape.as_ref(), &pose, collider.shared.as_ref(), 0.0)
            {
                let depth = -hit.dist;
                if deepest.as_ref().map_or(true, |(d, ..)| depth > *d) {
                    let normal = Vec3::new(hit.normal2.x, hit.normal2.y, hit.normal2.z);
                    deepest = Some((depth, normal, handle, collider.contents()));
                }
            }
        }

        deepest.and_then(|(_, normal, handle, contents)| {
            let normal = normal.normalize_or_zero();
            (normal != Vec3::ZERO).then_some((normal, handle, contents))
        })
    }
}

fn to_isometry(translation: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
        rotation.w, rotation.x, rotation.y, rotation.z,
    ));
    Isometry::from_parts(
        Translation3::new(translation.x, translation.y, translation.z),
        rotation,
    )
}

/// Opposite of the movement direction, preferring the horizontal plane.
fn fallback_normal(direction: Vec3) -> Vec3 {
    let horizontal = Vec3::new(-direction.x, 0.0, -direction.z);
    if horizontal.length_squared() > 0.1 {
        horizontal.normalize()
    } else if direction.y > 0.0 {
        Vec3::NEG_Y
    } else {
        Vec3::Y
    }
}

// ============================================================================
// Tests
// ============================================================================
