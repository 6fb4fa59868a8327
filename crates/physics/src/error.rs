use thiserror::Error;

use crate::collision::{BodyHandle, ColliderHandle};

/// Errors raised by the physics world.
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("unknown body handle {0:?}")]
    UnknownBody(BodyHandle),

    #[error("unknown collider handle {0:?}")]
    UnknownCollider(ColliderHandle),

    #[error("collider {0:?} is disabled")]
    DisabledCollider(ColliderHandle),

    #[error("body {0:?} is not kinematic")]
    NotKinematic(BodyHandle),
}
