//! Error types for the game crate.

use std::path::PathBuf;

use crystalrun_physics::PhysicsError;
use thiserror::Error;

use crate::sequencer::{LevelEvent, LevelPhase};

/// Errors that can occur while loading or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("serialize error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that can occur while running levels.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot handle {event:?} while {phase:?}")]
    InvalidTransition { phase: LevelPhase, event: LevelEvent },

    #[error("no level at index {0}")]
    UnknownLevel(usize),

    #[error("level list is empty")]
    NoLevels,

    #[error("simulation has been torn down")]
    TornDown,

    #[error(transparent)]
    Physics(#[from] PhysicsError),
}
