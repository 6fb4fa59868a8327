//! Crystalrun Game Logic
//!
//! This crate contains the player movement core of the platformer:
//!
//! - Input state with edge-triggered presses
//! - The character motor (walking, jumping, gravity, knockback)
//! - Hazards, pickups, jump pads and mud zones
//! - The follow / orbit camera rig
//! - Moving platforms, the countdown timer and level sequencing
//!
//! # Architecture
//!
//! Each level runs as a [`Simulation`] that owns its physics world. One tick
//! is one frame and always runs in the same order:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Simulation tick                          │
//! │  ┌───────┐  ┌───────────┐  ┌───────┐  ┌─────────┐  ┌──────────┐  │
//! │  │ Timer │─►│ Platforms │─►│ Motor │─►│ Physics │─►│ Hazards  │  │
//! │  └───────┘  └───────────┘  └───────┘  │  step   │  │ pickups  │  │
//! │                                ▲      └─────────┘  └────┬─────┘  │
//! │                     InputState │                        ▼        │
//! │                     camera ────┘                   ┌────────┐    │
//! │                     heading                        │ Camera │    │
//! │                                                    └────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Levels move through a [`LevelSequencer`]; [`Campaign`] drives it.

pub mod camera;
pub mod config;
mod error;
pub mod hazards;
pub mod input;
pub mod level;
pub mod motor;
pub mod obstacle;
pub mod platforms;
pub mod sequencer;
pub mod simulation;
pub mod timer;

// Re-export main types
pub use camera::{CameraConfig, CameraPolicy, CameraRig, LookInput};
pub use config::GameConfig;
pub use error::{ConfigError, LevelError};
pub use hazards::{HazardLayer, LayerConfig, LayerReport, LevelEvents, NoEvents};
pub use input::{Action, InputSnapshot, InputState, KeyBindings};
pub use level::Level;
pub use motor::{
    AnimationState, BodyMode, CharacterMotor, MotorConfig, MotorStep, MovementBasis,
    PlayerShape, PlayerState, PlayerTransform,
};
pub use obstacle::{EntityShape, Obstacle, ObstacleKind, Transform};
pub use platforms::{MovingPlatform, WaypointPath};
pub use sequencer::{Campaign, LevelEvent, LevelPhase, LevelSequencer};
pub use simulation::{FrameLoop, FrameReport, LevelSummary, Simulation, TickOutcome};
pub use timer::{CountdownTimer, TimerConfig, TimerStatus};

// Re-export physics types for convenience
pub use crystalrun_physics::{ControllerConfig, PhysicsError, PhysicsWorld};
