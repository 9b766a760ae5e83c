//! Core functionalities.
mod env;
mod policy;
mod step;
pub use env::Env;
pub use policy::{Configurable, Policy};
use std::fmt::Debug;
pub use step::{Info, Step, Termination};

/// An observation of an environment.
///
/// Observations are images of shape `[height, width, channels]`.
/// They are cloned once per step, so implementations should share their
/// pixel storage rather than copy it.
pub trait Obs: Clone + Debug {
    /// Returns the shape of the observation as `[height, width, channels]`.
    fn shape(&self) -> [usize; 3];

    /// Returns the values of the observation scaled to `[0, 1]`, flattened in
    /// row-major `HWC` order.
    fn to_scaled(&self) -> Vec<f32>;
}

/// A discrete action of an environment.
pub trait Act: Clone + Debug {
    /// The number of available actions.
    const N_ACTIONS: usize;

    /// Constructs the action with the given index.
    ///
    /// # Panics
    ///
    /// Panics if `ix >= Self::N_ACTIONS`.
    fn from_index(ix: usize) -> Self;

    /// Returns the index of the action.
    fn index(&self) -> usize;
}
