//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The policy returned action-values which do not fit the action space.
    #[error("Malformed policy output: {reason} (values = {values:?})")]
    PolicyOutput {
        /// What is wrong with the output.
        reason: String,

        /// The offending action-values.
        values: Vec<f32>,
    },

    /// The environment stopped delivering observations.
    #[error("Simulator disconnected in episode {episode} after {steps} steps")]
    SimulatorDisconnected {
        /// Index of the episode.
        episode: usize,

        /// Steps taken in the episode.
        steps: usize,
    },
}
