//! Configuration of [`EvalLoop`](super::EvalLoop).
use crate::fps::DEFAULT_FPS_WINDOW;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`EvalLoop`](super::EvalLoop).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct EvalConfig {
    /// The number of episodes to run. `None` runs until the process is interrupted.
    pub max_episodes: Option<usize>,

    /// The number of step durations averaged for the reported FPS.
    pub fps_window: usize,

    /// How many times a failing reset is attempted before giving up.
    pub max_reset_attempts: usize,

    /// If `false`, observations are not handed to the frame store.
    pub persist_frames: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_episodes: None,
            fps_window: DEFAULT_FPS_WINDOW,
            max_reset_attempts: 3,
            persist_frames: true,
        }
    }
}

impl EvalConfig {
    /// Sets the number of episodes.
    pub fn max_episodes(mut self, v: Option<usize>) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the size of the FPS window.
    pub fn fps_window(mut self, v: usize) -> Self {
        self.fps_window = v;
        self
    }

    /// Sets the number of reset attempts.
    pub fn max_reset_attempts(mut self, v: usize) -> Self {
        self.max_reset_attempts = v;
        self
    }

    /// Enables or disables frame persistence.
    pub fn persist_frames(mut self, v: bool) -> Self {
        self.persist_frames = v;
        self
    }

    /// Constructs [`EvalConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(config)
    }

    /// Saves [`EvalConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
