//! Level obstacles.
//!
//! An obstacle is a shape placed in the world with one of three behaviours:
//! solid and still, a non-blocking sensor, or a solid platform travelling
//! along a waypoint path. Registration turns it into a body and collider in
//! the physics world.

use crystalrun_physics::{
    BodyDesc, BodyHandle, ColliderDesc, ColliderHandle, ColliderShape, ContentFlags, PhysicsError,
    PhysicsWorld,
};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::platforms::{MovingPlatform, WaypointPath};

/// Position and heading of an entity. Entities only ever turn around +Y.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    #[serde(default)]
    pub yaw: f32,
}

impl Transform {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            yaw: 0.0,
        }
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    /// Express a world point in this transform's local frame.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation().inverse() * (point - self.translation)
    }
}

/// Volume of a level entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntityShape {
    Aabb { half_extents: Vec3 },
    Sphere { radius: f32 },
    Cylinder { half_height: f32, radius: f32 },
}

impl EntityShape {
    pub fn aabb(hx: f32, hy: f32, hz: f32) -> Self {
        Self::Aabb {
            half_extents: Vec3::new(hx, hy, hz),
        }
    }

    /// Whether `point` lies inside the shape placed at `transform`.
    pub fn contains(&self, transform: &Transform, point: Vec3) -> bool {
        let local = transform.to_local(point);
        match *self {
            Self::Aabb { half_extents } => local.abs().cmple(half_extents).all(),
            Self::Sphere { radius } => local.length_squared() <= radius * radius,
            Self::Cylinder {
                half_height,
                radius,
            } => local.y.abs() <= half_height && local.x * local.x + local.z * local.z <= radius * radius,
        }
    }

    pub fn to_collider_shape(&self) -> ColliderShape {
        match *self {
            Self::Aabb { half_extents } => ColliderShape::cuboid(half_extents),
            Self::Sphere { radius } => ColliderShape::ball(radius),
            Self::Cylinder {
                half_height,
                radius,
            } => ColliderShape::cylinder(half_height, radius),
        }
    }
}

/// How an obstacle behaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Solid and never moves.
    Static,
    /// Reports overlaps, never blocks.
    Sensor,
    /// Solid platform following a path.
    Moving(WaypointPath),
}

/// A placed obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub shape: EntityShape,
    pub transform: Transform,
    pub kind: ObstacleKind,
    #[serde(default = "default_contents")]
    pub contents: ContentFlags,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_contents() -> ContentFlags {
    ContentFlags::SOLID
}

fn default_enabled() -> bool {
    true
}

/// Physics objects created for an obstacle.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredObstacle {
    pub body: BodyHandle,
    pub collider: ColliderHandle,
    /// Present for [`ObstacleKind::Moving`].
    pub platform: Option<MovingPlatform>,
}

impl Obstacle {
    /// A solid box centered at `center`.
    pub fn block(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            shape: EntityShape::Aabb { half_extents },
            transform: Transform::at(center),
            kind: ObstacleKind::Static,
            contents: ContentFlags::SOLID,
            enabled: true,
        }
    }

    /// A solid box travelling between `start` and `end` at `speed` m/s.
    pub fn moving_block(start: Vec3, end: Vec3, speed: f32, half_extents: Vec3) -> Self {
        Self {
            shape: EntityShape::Aabb { half_extents },
            transform: Transform::at(start),
            kind: ObstacleKind::Moving(WaypointPath::new(start, end, speed)),
            contents: ContentFlags::SOLID,
            enabled: true,
        }
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.transform.yaw = yaw;
        self
    }

    pub fn with_kind(mut self, kind: ObstacleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_contents(mut self, contents: ContentFlags) -> Self {
        self.contents = contents;
        self
    }

    /// Create the obstacle's body and collider.
    ///
    /// Moving obstacles get a kinematic body placed at the start of their
    /// path and a [`MovingPlatform`] that drives it.
    pub fn register(&self, world: &mut PhysicsWorld) -> Result<RegisteredObstacle, PhysicsError> {
        let (desc, translation) = match &self.kind {
            ObstacleKind::Moving(path) => {
                (BodyDesc::kinematic_position_based(), path.position())
            }
            ObstacleKind::Static | ObstacleKind::Sensor => {
                (BodyDesc::fixed(), self.transform.translation)
            }
        };
        let body = world.create_body(
            desc.translation(translation)
                .rotation(self.transform.rotation()),
        );

        let collider = world.create_collider(
            ColliderDesc::new(self.shape.to_collider_shape())
                .contents(self.contents)
                .sensor(matches!(self.kind, ObstacleKind::Sensor))
                .enabled(self.enabled),
            Some(body),
        )?;

        let platform = match &self.kind {
            ObstacleKind::Moving(path) => Some(MovingPlatform::new(body, collider, path.clone())),
            _ => None,
        };

        Ok(RegisteredObstacle {
            body,
            collider,
            platform,
        })
    }
}
