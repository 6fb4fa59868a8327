//! Crystalrun Physics
//!
//! The physics collaborator for the platformer movement core. It owns rigid
//! bodies and colliders, answers swept-shape queries against them, and
//! provides a kinematic character controller built on those queries.
//!
//! # Architecture
//!
//! The crate is split into two systems:
//!
//! - **Collision**: Bodies, colliders and the [`PhysicsWorld`] that traces
//!   shapes through them and resolves penetration
//! - **Controller**: The [`CharacterController`] that turns a desired
//!   displacement into the largest legal one (sliding, slopes, steps,
//!   ground snapping)
//!
//! The world is stepped once per frame. Kinematic bodies are moved either
//! immediately ([`PhysicsWorld::move_kinematic_body`], used by moving
//! platforms so they settle before the character queries) or at the next
//! [`PhysicsWorld::step`] ([`PhysicsWorld::set_next_kinematic_translation`],
//! used by the player).

pub mod collision;
pub mod controller;
mod error;

// Re-export commonly used types
pub use collision::{
    BodyDesc, BodyHandle, BodyKind, Collider, ColliderDesc, ColliderHandle, ColliderShape,
    ContentFlags, PhysicsWorld, QueryFilter, RigidBody, TraceResult,
};
pub use controller::{AutostepConfig, CharacterController, ControllerConfig, MoveOutcome};
pub use error::PhysicsError;
