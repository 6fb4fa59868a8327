//! Moving platforms.
//!
//! Platforms move with [`PhysicsWorld::move_kinematic_body`], which takes
//! effect immediately, so every query issued later in the same tick sees
//! the platform where it is now. Platforms must be updated before the motor
//! runs.

use crystalrun_physics::{BodyHandle, ColliderHandle, PhysicsError, PhysicsWorld};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Back-and-forth path between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointPath {
    pub start: Vec3,
    pub end: Vec3,
    /// Travel speed (meters/second). Zero or less keeps the platform still.
    pub speed: f32,
    /// Position along the path in `[0, 1]`.
    #[serde(default)]
    pub progress: f32,
    /// Travelling from start to end.
    #[serde(default = "default_forward")]
    pub forward: bool,
}

fn default_forward() -> bool {
    true
}

impl WaypointPath {
    pub fn new(start: Vec3, end: Vec3, speed: f32) -> Self {
        Self {
            start,
            end,
            speed,
            progress: 0.0,
            forward: true,
        }
    }

    pub fn is_static(&self) -> bool {
        self.speed <= 0.0 || self.start == self.end
    }

    pub fn position(&self) -> Vec3 {
        self.start.lerp(self.end, self.progress)
    }

    /// Advance along the path, turning around at either end.
    pub fn advance(&mut self, dt: f32) -> Vec3 {
        if self.is_static() {
            return self.position();
        }
        let delta = self.speed * dt / self.start.distance(self.end);
        self.progress += if self.forward { delta } else { -delta };

        if self.progress >= 1.0 {
            self.progress = 1.0;
            self.forward = false;
        } else if self.progress <= 0.0 {
            self.progress = 0.0;
            self.forward = true;
        }
        self.position()
    }
}

/// A kinematic body driven along a [`WaypointPath`].
#[derive(Debug, Clone, PartialEq)]
pub struct MovingPlatform {
    body: BodyHandle,
    collider: ColliderHandle,
    path: WaypointPath,
}

impl MovingPlatform {
    pub fn new(body: BodyHandle, collider: ColliderHandle, path: WaypointPath) -> Self {
        Self {
            body,
            collider,
            path,
        }
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn collider(&self) -> ColliderHandle {
        self.collider
    }

    pub fn path(&self) -> &WaypointPath {
        &self.path
    }

    pub fn position(&self) -> Vec3 {
        self.path.position()
    }

    /// Advance the path and move the body there right away.
    pub fn update(&mut self, world: &mut PhysicsWorld, dt: f32) -> Result<Vec3, PhysicsError> {
        if self.path.is_static() {
            return Ok(self.path.position());
        }
        let position = self.path.advance(dt);
        world.move_kinematic_body(self.body, position, None)?;
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crystalrun_physics::{BodyDesc, ColliderDesc, ColliderShape, QueryFilter};

    #[test]
    fn test_path_bounces_between_ends() {
        let mut path = WaypointPath::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 1.0);

        path.advance(1.0);
        path.advance(1.5);
        // Overshoot clamps to the end and turns around
        assert_eq!(path.progress, 1.0);
        assert!(!path.forward);

        path.advance(0.5);
        assert!((path.position().x - 1.5).abs() < 1e-5);

        path.advance(10.0);
        assert_eq!(path.position(), Vec3::ZERO);
        assert!(path.forward);
    }

    #[test]
    fn test_static_paths_never_move() {
        let mut still = WaypointPath::new(Vec3::ONE, Vec3::ONE, 3.0);
        assert!(still.is_static());
        assert_eq!(still.advance(1.0), Vec3::ONE);

        let mut stopped = WaypointPath::new(Vec3::ZERO, Vec3::X, 0.0);
        assert!(stopped.is_static());
        assert_eq!(stopped.advance(1.0), Vec3::ZERO);
        assert!(stopped.progress.is_finite());
    }

    #[test]
    fn test_update_moves_collider_immediately() {
        let mut world = PhysicsWorld::new();
        let body = world.create_body(BodyDesc::kinematic_position_based());
        let collider = world
            .create_collider(ColliderDesc::cuboid(1.0, 0.25, 1.0), Some(body))
            .unwrap();
        let mut platform = MovingPlatform::new(
            body,
            collider,
            WaypointPath::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 5.0),
        );

        let position = platform.update(&mut world, 1.0).unwrap();
        assert_eq!(position, Vec3::new(5.0, 0.0, 0.0));

        // No step needed for queries to see it
        let probe = ColliderShape::ball(0.2);
        assert!(world.intersects(position, &probe, QueryFilter::solid()));
        assert!(!world.intersects(Vec3::ZERO, &probe, QueryFilter::solid()));
        assert_eq!(world.body(body).unwrap().frame_delta(), position);
    }
}
