//! Environment.
use super::{Act, Info, Obs, Step};
use crate::record::Record;
use anyhow::Result;

/// Represents a simulated environment with a synchronous step/reset interface.
///
/// Implementations typically wrap a simulator which delivers observations
/// asynchronously; the adapter hides that behind blocking, bounded calls.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Starts a new episode and returns its first observation.
    ///
    /// Resources held by the previous episode are released before the new
    /// episode is set up.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Performs an environment step.
    ///
    /// When the returned [`Step`] is terminal, the resources of the episode
    /// have already been released.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Releases the resources of the current episode, if any.
    fn close(&mut self) {}
}
