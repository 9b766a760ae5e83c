//! Policy.
use super::Env;
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::path::Path;

/// A policy on an environment.
///
/// The policy maps an observation to one value per discrete action.
/// The evaluation loop acts greedily on these values.
pub trait Policy<E: Env> {
    /// Returns the action-values for the given observation.
    ///
    /// The returned vector is expected to have one finite element per action.
    fn action_values(&mut self, obs: &E::Obs) -> Result<Vec<f32>>;

    /// Runs one-time initialization before the first episode.
    ///
    /// Does nothing in the default implementation.
    fn warmup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A configurable object, having type parameter.
pub trait Configurable<E: Env> {
    /// Configuration.
    type Config: Clone + DeserializeOwned;

    /// Builds the object.
    fn build(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Builds the object with the configuration in the yaml file of the given path.
    fn build_from_path(path: impl AsRef<Path>) -> Result<Self>
    where
        Self: Sized,
    {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Self::build(config)
    }
}
