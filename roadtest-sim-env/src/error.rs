//! Errors of the simulator boundary and of the environment adapter.
use crate::sim::ActorId;
use thiserror::Error;

/// Errors reported by a [`Simulator`](crate::Simulator).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Failed to connect.
    #[error("Failed to connect to the simulator: {0}")]
    Connection(String),

    /// No blueprint with the given identifier.
    #[error("Unknown blueprint: {0}")]
    UnknownBlueprint(String),

    /// A blueprint attribute has an unusable value.
    #[error("Invalid value {value:?} for attribute {key}")]
    InvalidAttribute {
        /// Attribute.
        key: String,

        /// Value.
        value: String,
    },

    /// The spawn location is occupied.
    #[error("Spawn failed because of collision at ({x}, {y})")]
    SpawnCollision {
        /// Forward location.
        x: f32,

        /// Lateral location.
        y: f32,
    },

    /// The actor does not exist (anymore).
    #[error("No such actor: {0}")]
    NoSuchActor(ActorId),

    /// The actor exists but does not support the operation.
    #[error("Actor {0} does not support {1}")]
    Unsupported(ActorId, &'static str),

    /// The connection to the simulator was lost.
    #[error("Simulator disconnected: {0}")]
    Disconnected(String),
}

/// Errors of [`DriveEnv`](crate::DriveEnv).
#[derive(Error, Debug)]
pub enum DriveEnvError {
    /// The camera did not deliver the first frame in time.
    #[error("No camera frame within {0:?} after setting up the episode")]
    SetupTimeout(std::time::Duration),

    /// Every attempted spawn point was occupied.
    #[error("No free spawn point after {0} attempts")]
    NoFreeSpawnPoint(usize),

    /// The map has no spawn points.
    #[error("The map has no spawn points")]
    NoSpawnPoints,

    /// A timeout of the configuration is negative, not finite or too large.
    #[error("Invalid {name}: {secs}")]
    InvalidTimeout {
        /// Field of the configuration.
        name: &'static str,

        /// Configured value.
        secs: f32,
    },

    /// `step()` was called without a running episode.
    #[error("No running episode, call reset() first")]
    NoEpisode,

    /// Error from the simulator.
    #[error(transparent)]
    Sim(#[from] SimError),
}
