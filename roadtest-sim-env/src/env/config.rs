//! Configuration of [`DriveEnv`](super::DriveEnv).
use crate::{sim::Mount, ActionMapper};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Rewards of [`DriveEnv`](super::DriveEnv).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Reward of the step in which a collision happened. Ends the episode.
    pub collision_penalty: f32,

    /// Reward of the step in which the time limit was exceeded. Ends the episode.
    pub timeout_reward: f32,

    /// Reward of a step driven below [`RewardConfig::min_speed_kmh`].
    pub slow_penalty: f32,

    /// Reward of a step driven at or above [`RewardConfig::min_speed_kmh`].
    pub cruise_reward: f32,

    /// Speed threshold in km/h.
    pub min_speed_kmh: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            collision_penalty: -200.0,
            timeout_reward: 0.0,
            slow_penalty: -1.0,
            cruise_reward: 1.0,
            min_speed_kmh: 50.0,
        }
    }
}

/// Configuration of [`DriveEnv`](super::DriveEnv).
///
/// `C` is the configuration of the [`Simulator`](crate::Simulator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveEnvConfig<C> {
    /// Connection to the simulator.
    pub sim: C,

    /// Blueprint of the ego vehicle.
    pub vehicle_blueprint: String,

    /// Width of the camera image.
    pub image_width: u32,

    /// Height of the camera image.
    pub image_height: u32,

    /// Horizontal field of view of the camera in degrees.
    pub fov: f32,

    /// Placement of the camera on the vehicle.
    pub camera_mount: Mount,

    /// Spawn points tried before giving up in a reset.
    pub max_spawn_attempts: usize,

    /// Bound of the wait for the first frame of an episode.
    pub first_frame_timeout_secs: f32,

    /// Bound of the wait for a fresh frame in a step.
    pub step_frame_timeout_secs: f32,

    /// Consecutive steps without a fresh frame tolerated before the episode
    /// ends as disconnected.
    pub max_stale_steps: usize,

    /// Wall-clock length of an episode.
    pub seconds_per_episode: f32,

    /// If `false`, episodes end only by collision or disconnection.
    pub time_limit: bool,

    /// Rewards.
    pub reward: RewardConfig,

    /// Controls of the actions.
    pub action_mapper: ActionMapper,
}

impl<C: Default> Default for DriveEnvConfig<C> {
    fn default() -> Self {
        Self {
            sim: C::default(),
            vehicle_blueprint: "vehicle.tesla.model3".to_string(),
            image_width: 640,
            image_height: 480,
            fov: 110.0,
            camera_mount: Mount::rigid(2.5, 0.0, 0.7),
            max_spawn_attempts: 10,
            first_frame_timeout_secs: 5.0,
            step_frame_timeout_secs: 1.0,
            max_stale_steps: 10,
            seconds_per_episode: 10.0,
            time_limit: true,
            reward: RewardConfig::default(),
            action_mapper: ActionMapper::default(),
        }
    }
}

impl<C> DriveEnvConfig<C> {
    /// Sets the configuration of the simulator.
    pub fn sim(mut self, v: C) -> Self {
        self.sim = v;
        self
    }

    /// Sets the blueprint of the ego vehicle.
    pub fn vehicle_blueprint(mut self, v: impl Into<String>) -> Self {
        self.vehicle_blueprint = v.into();
        self
    }

    /// Sets the size of the camera image.
    pub fn image_size(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Sets the field of view of the camera.
    pub fn fov(mut self, v: f32) -> Self {
        self.fov = v;
        self
    }

    /// Sets the placement of the camera.
    pub fn camera_mount(mut self, v: Mount) -> Self {
        self.camera_mount = v;
        self
    }

    /// Sets the number of spawn points tried in a reset.
    pub fn max_spawn_attempts(mut self, v: usize) -> Self {
        self.max_spawn_attempts = v;
        self
    }

    /// Sets the bound of the wait for the first frame.
    pub fn first_frame_timeout_secs(mut self, v: f32) -> Self {
        self.first_frame_timeout_secs = v;
        self
    }

    /// Sets the bound of the wait for a fresh frame in a step.
    pub fn step_frame_timeout_secs(mut self, v: f32) -> Self {
        self.step_frame_timeout_secs = v;
        self
    }

    /// Sets the number of tolerated stale steps.
    pub fn max_stale_steps(mut self, v: usize) -> Self {
        self.max_stale_steps = v;
        self
    }

    /// Sets the length of an episode.
    pub fn seconds_per_episode(mut self, v: f32) -> Self {
        self.seconds_per_episode = v;
        self
    }

    /// Enables or disables the time limit.
    pub fn time_limit(mut self, v: bool) -> Self {
        self.time_limit = v;
        self
    }

    /// Sets the rewards.
    pub fn reward(mut self, v: RewardConfig) -> Self {
        self.reward = v;
        self
    }

    /// Sets the controls of the actions.
    pub fn action_mapper(mut self, v: ActionMapper) -> Self {
        self.action_mapper = v;
        self
    }
}

impl<C: Serialize + DeserializeOwned> DriveEnvConfig<C> {
    /// Constructs [`DriveEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(config)
    }

    /// Saves [`DriveEnvConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
