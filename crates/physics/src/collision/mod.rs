//! Collision detection for the character core.
//!
//! This module stores rigid bodies and their colliders and answers the
//! queries the character controller needs.
//!
//! # Key Types
//!
//! - [`PhysicsWorld`]: Bodies, colliders and all spatial queries
//! - [`ColliderShape`]: Cuboid, ball, cylinder or capsule
//! - [`TraceResult`]: Output from a swept shape trace
//! - [`QueryFilter`]: Which colliders a query may hit
//!
//! # Tracing Algorithm
//!
//! Traces march the shape along the path in steps no longer than half its
//! smallest extent, so nothing thinner than the step is skipped, and then
//! binary search the first blocked sample. They return:
//! - How far the shape traveled (fraction 0.0-1.0)
//! - The final position
//! - Surface normal at impact (if any)
//! - The collider that was hit

mod body;
mod flags;
mod shape;
mod trace;
mod world;

pub use body::{BodyDesc, BodyHandle, BodyKind, RigidBody};
pub use flags::ContentFlags;
pub use shape::{Collider, ColliderDesc, ColliderHandle, ColliderShape};
pub use trace::{QueryFilter, TraceResult};
pub use world::PhysicsWorld;
