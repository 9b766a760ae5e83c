//! Persistence of observed frames.
use anyhow::Result;

/// Stores observations under a frame index.
///
/// The evaluation loop hands every pre-step observation to the store with a
/// process-wide, strictly increasing index. A store must never overwrite a
/// frame it stored before.
pub trait FrameStore<O> {
    /// Stores `obs` as frame `index`.
    fn store(&mut self, index: u64, obs: &O) -> Result<()>;
}

/// A frame store discarding every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFrameStore;

impl<O> FrameStore<O> for NullFrameStore {
    fn store(&mut self, _index: u64, _obs: &O) -> Result<()> {
        Ok(())
    }
}

impl<O, F: FrameStore<O> + ?Sized> FrameStore<O> for Box<F> {
    fn store(&mut self, index: u64, obs: &O) -> Result<()> {
        (**self).store(index, obs)
    }
}
