//! Kinematic character controller.
//!
//! The controller never moves a body itself. Given a collider and a desired
//! displacement it returns the largest displacement the collider can make:
//!
//! - Sliding along walls and into corners
//! - Climbing slopes up to a maximum angle, sliding on steeper ones
//! - Stepping onto ledges up to an autostep height
//! - Snapping down onto descending ground while walking
//! - Reporting whether the collider ended the move grounded
//!
//! # Design
//!
//! [`CharacterController::compute_collider_movement`] works purely on
//! queries against the [`PhysicsWorld`](crate::PhysicsWorld). The caller
//! commits the result to the body (next kinematic translation, or a
//! velocity for dynamic bodies) and steps the world.

mod config;
mod kinematic;
mod slide_move;

pub use config::{AutostepConfig, ControllerConfig};
pub use kinematic::{CharacterController, MoveOutcome};
pub use slide_move::clip_velocity;
