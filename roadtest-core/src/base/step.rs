//! Environment step.
use super::Env;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Additional information to `Obs` and `Act`.
pub trait Info {}

impl Info for () {}

/// The reason an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Termination {
    /// The vehicle collided with something.
    Crashed,

    /// The episode ran past its time limit.
    TimedOut,

    /// The environment stopped delivering observations.
    Disconnected,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Crashed => "crashed",
            Self::TimedOut => "timed out",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
///
/// An environment emits a [`Step`] object at every interaction step.
/// It is consumed once by the evaluation loop and not retained.
pub struct Step<E: Env> {
    /// Action.
    pub act: E::Act,

    /// Observation.
    pub obs: E::Obs,

    /// Reward.
    pub reward: f32,

    /// Set if the episode ended at this step.
    pub termination: Option<Termination>,

    /// Information defined by the environment.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: f32,
        termination: Option<Termination>,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            termination,
            info,
        }
    }

    #[inline]
    /// Returns `true` if the episode ended at this step.
    pub fn is_done(&self) -> bool {
        self.termination.is_some()
    }
}
