//! Rigid bodies.
//!
//! Bodies only carry a pose and how that pose changes. Geometry lives in
//! colliders attached to them.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Handle to a body stored in a [`PhysicsWorld`](super::PhysicsWorld).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// How a body's pose is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves.
    #[default]
    Fixed,
    /// Moved by user code, either at the next step or immediately.
    KinematicPositionBased,
    /// Moved by its linear velocity at each step. The world applies no
    /// gravity; whoever owns the body integrates it.
    Dynamic,
}

/// Description used to create a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub translation: Vec3,
    pub rotation: Quat,
}

impl BodyDesc {
    pub fn fixed() -> Self {
        Self::new(BodyKind::Fixed)
    }

    pub fn kinematic_position_based() -> Self {
        Self::new(BodyKind::KinematicPositionBased)
    }

    pub fn dynamic() -> Self {
        Self::new(BodyKind::Dynamic)
    }

    fn new(kind: BodyKind) -> Self {
        Self {
            kind,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }
}

/// A rigid body in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    kind: BodyKind,
    translation: Vec3,
    rotation: Quat,
    next_translation: Option<Vec3>,
    next_rotation: Option<Quat>,
    linvel: Vec3,
    /// Displacement applied since the last step.
    frame_delta: Vec3,
}

impl RigidBody {
    pub(crate) fn from_desc(desc: BodyDesc) -> Self {
        Self {
            kind: desc.kind,
            translation: desc.translation,
            rotation: desc.rotation.normalize(),
            next_translation: None,
            next_rotation: None,
            linvel: Vec3::ZERO,
            frame_delta: Vec3::ZERO,
        }
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn is_kinematic(&self) -> bool {
        self.kind == BodyKind::KinematicPositionBased
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn linvel(&self) -> Vec3 {
        self.linvel
    }

    /// Translation that will be applied at the next step, if any.
    pub fn next_translation(&self) -> Option<Vec3> {
        self.next_translation
    }

    /// How far the body has moved since the last step.
    ///
    /// Moving platforms move before the character queries, so the character
    /// reads this to ride along.
    pub fn frame_delta(&self) -> Vec3 {
        self.frame_delta
    }

    pub(crate) fn set_next_translation(&mut self, translation: Vec3) {
        self.next_translation = Some(translation);
    }

    pub(crate) fn set_next_rotation(&mut self, rotation: Quat) {
        self.next_rotation = Some(rotation.normalize());
    }

    pub(crate) fn set_linvel(&mut self, linvel: Vec3) {
        self.linvel = linvel;
    }

    /// Teleport without recording a frame delta.
    pub(crate) fn teleport(&mut self, translation: Vec3) {
        self.translation = translation;
        self.next_translation = None;
    }

    /// Move right away, recording the displacement for riders.
    pub(crate) fn move_now(&mut self, translation: Vec3, rotation: Option<Quat>) {
        self.frame_delta += translation - self.translation;
        self.translation = translation;
        if let Some(rotation) = rotation {
            self.rotation = rotation.normalize();
        }
    }

    /// Advance one step. Returns the displacement applied during the step.
    pub(crate) fn integrate(&mut self, dt: f32) -> Vec3 {
        let before = self.translation;
        match self.kind {
            BodyKind::Fixed => {}
            BodyKind::KinematicPositionBased => {
                if let Some(next) = self.next_translation.take() {
                    self.translation = next;
                }
                if let Some(next) = self.next_rotation.take() {
                    self.rotation = next;
                }
            }
            BodyKind::Dynamic => {
                self.translation += self.linvel * dt;
            }
        }
        self.translation - before
    }

    pub(crate) fn clear_frame_delta(&mut self) {
        self.frame_delta = Vec3::ZERO;
    }
}
