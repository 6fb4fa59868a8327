//! Collider shapes and collider records.

use glam::Vec3;
use parry3d::shape::SharedShape;
use serde::{Deserialize, Serialize};

use super::body::BodyHandle;
use super::flags::ContentFlags;

/// Handle to a collider stored in a [`PhysicsWorld`](super::PhysicsWorld).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderHandle(pub u32);

/// Geometry of a collider, centered on its pose.
///
/// Vertical shapes are described by their total half height, so a capsule
/// and a cylinder with the same numbers cover the same vertical span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Box with the given half extents.
    Cuboid { half_extents: Vec3 },
    /// Sphere.
    Ball { radius: f32 },
    /// Upright cylinder.
    Cylinder { half_height: f32, radius: f32 },
    /// Upright capsule. `half_height` includes the hemispherical caps.
    Capsule { half_height: f32, radius: f32 },
}

impl ColliderShape {
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Cuboid { half_extents }
    }

    pub fn ball(radius: f32) -> Self {
        Self::Ball { radius }
    }

    pub fn cylinder(half_height: f32, radius: f32) -> Self {
        Self::Cylinder { half_height, radius }
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::Capsule { half_height, radius }
    }

    /// Distance from the shape's center to its lowest point.
    pub fn half_height(&self) -> f32 {
        match *self {
            Self::Cuboid { half_extents } => half_extents.y,
            Self::Ball { radius } => radius,
            Self::Cylinder { half_height, .. } | Self::Capsule { half_height, .. } => half_height,
        }
    }

    /// Smallest distance from the center to the surface.
    pub fn min_extent(&self) -> f32 {
        match *self {
            Self::Cuboid { half_extents } => half_extents.min_element(),
            Self::Ball { radius } => radius,
            Self::Cylinder { half_height, radius } | Self::Capsule { half_height, radius } => {
                half_height.min(radius)
            }
        }
    }

    /// The same shape grown by `amount` in every direction.
    pub fn inflated(&self, amount: f32) -> Self {
        match *self {
            Self::Cuboid { half_extents } => Self::Cuboid {
                half_extents: half_extents + Vec3::splat(amount),
            },
            Self::Ball { radius } => Self::Ball {
                radius: radius + amount,
            },
            Self::Cylinder { half_height, radius } => Self::Cylinder {
                half_height: half_height + amount,
                radius: radius + amount,
            },
            Self::Capsule { half_height, radius } => Self::Capsule {
                half_height: half_height + amount,
                radius: radius + amount,
            },
        }
    }

    /// Build the parry shape used for queries.
    pub fn to_shared(&self) -> SharedShape {
        match *self {
            Self::Cuboid { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Self::Ball { radius } => SharedShape::ball(radius),
            Self::Cylinder { half_height, radius } => SharedShape::cylinder(half_height, radius),
            Self::Capsule { half_height, radius } => {
                // Parry wants the half height of the segment between the caps
                let segment_half_height = (half_height - radius).max(0.0);
                SharedShape::capsule_y(segment_half_height, radius)
            }
        }
    }
}

/// Description used to create a collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderDesc {
    pub shape: ColliderShape,
    /// Offset from the parent body (or world origin when unattached).
    pub translation: Vec3,
    pub contents: ContentFlags,
    /// Sensors report overlaps but never block movement.
    pub sensor: bool,
    pub enabled: bool,
    /// Free slot for the owner to link the collider back to its entity.
    pub user_data: u64,
}

impl ColliderDesc {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            translation: Vec3::ZERO,
            contents: ContentFlags::SOLID,
            sensor: false,
            enabled: true,
            user_data: 0,
        }
    }

    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        Self::new(ColliderShape::cuboid(Vec3::new(hx, hy, hz)))
    }

    pub fn ball(radius: f32) -> Self {
        Self::new(ColliderShape::ball(radius))
    }

    pub fn cylinder(half_height: f32, radius: f32) -> Self {
        Self::new(ColliderShape::cylinder(half_height, radius))
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::new(ColliderShape::capsule(half_height, radius))
    }

    pub fn translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn contents(mut self, contents: ContentFlags) -> Self {
        self.contents = contents;
        self
    }

    pub fn sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }
}

/// A collider in the world.
#[derive(Clone)]
pub struct Collider {
    pub(crate) desc: ColliderDesc,
    pub(crate) shared: SharedShape,
    pub(crate) parent: Option<BodyHandle>,
}

impl std::fmt::Debug for Collider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collider")
            .field("desc", &self.desc)
            .field("parent", &self.parent)
            .finish()
    }
}

impl Collider {
    pub(crate) fn new(desc: ColliderDesc, parent: Option<BodyHandle>) -> Self {
        Self {
            shared: desc.shape.to_shared(),
            desc,
            parent,
        }
    }

    pub fn shape(&self) -> ColliderShape {
        self.desc.shape
    }

    pub fn parent(&self) -> Option<BodyHandle> {
        self.parent
    }

    pub fn contents(&self) -> ContentFlags {
        self.desc.contents
    }

    pub fn is_sensor(&self) -> bool {
        self.desc.sensor
    }

    pub fn is_enabled(&self) -> bool {
        self.desc.enabled
    }

    pub fn user_data(&self) -> u64 {
        self.desc.user_data
    }

    /// Offset from the parent body.
    pub fn local_translation(&self) -> Vec3 {
        self.desc.translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_height_matches_vertical_span() {
        assert_eq!(ColliderShape::capsule(0.9, 0.5).half_height(), 0.9);
        assert_eq!(ColliderShape::cylinder(0.9, 0.5).half_height(), 0.9);
        assert_eq!(ColliderShape::ball(0.3).half_height(), 0.3);
        assert_eq!(
            ColliderShape::cuboid(Vec3::new(2.0, 0.25, 1.0)).half_height(),
            0.25
        );
    }

    #[test]
    fn test_inflated_grows_every_dimension() {
        let grown = ColliderShape::capsule(0.9, 0.5).inflated(0.01);
        match grown {
            ColliderShape::Capsule { half_height, radius } => {
                assert!((half_height - 0.91).abs() < 1e-6);
                assert!((radius - 0.51).abs() < 1e-6);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_min_extent() {
        assert_eq!(ColliderShape::cylinder(0.9, 0.5).min_extent(), 0.5);
        assert_eq!(
            ColliderShape::cuboid(Vec3::new(5.0, 0.1, 5.0)).min_extent(),
            0.1
        );
    }

    #[test]
    fn test_desc_builder() {
        let desc = ColliderDesc::ball(1.0)
            .sensor(true)
            .contents(ContentFlags::PICKUP)
            .translation(Vec3::Y)
            .user_data(7);
        assert!(desc.sensor);
        assert_eq!(desc.contents, ContentFlags::PICKUP);
        assert_eq!(desc.translation, Vec3::Y);
        assert_eq!(desc.user_data, 7);
        assert!(desc.enabled);
    }
}
