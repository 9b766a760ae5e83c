use crate::args::Args;
use anyhow::Result;
use roadtest_core::EvalConfig;
use roadtest_policy_no_backend::MlpPolicyConfig;
use roadtest_sim_env::{DriveEnvConfig, SandboxConfig};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of a run of `roadtest`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RoadtestConfig {
    /// Evaluation loop.
    pub eval: EvalConfig,

    /// Environment and simulator.
    pub env: DriveEnvConfig<SandboxConfig>,

    /// Policy.
    pub policy: MlpPolicyConfig,

    /// Existing directory the camera frames are written to.
    pub frames_dir: String,

    /// TensorBoard log directory. Telemetry is only logged if not set.
    pub tensorboard: Option<String>,

    /// Random seed of the environment and of initialized policies.
    pub seed: i64,
}

impl Default for RoadtestConfig {
    fn default() -> Self {
        Self {
            eval: EvalConfig::default(),
            env: DriveEnvConfig::default(),
            policy: MlpPolicyConfig::default(),
            frames_dir: "_out".to_string(),
            tensorboard: None,
            seed: 42,
        }
    }
}

impl RoadtestConfig {
    /// Constructs [`RoadtestConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(config)
    }

    /// Saves [`RoadtestConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Overrides the configuration with the command line.
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(model) = &args.model {
            self.policy.model_path = model.clone();
        }
        if let Some(dir) = &args.frames_dir {
            self.frames_dir = dir.clone();
        }
        if args.no_frames {
            self.eval.persist_frames = false;
        }
        if args.episodes.is_some() {
            self.eval.max_episodes = args.episodes;
        }
        if let Some(seed) = args.seed {
            self.seed = seed;
        }
        if args.tensorboard.is_some() {
            self.tensorboard = args.tensorboard.clone();
        }
        if args.no_time_limit {
            self.env.time_limit = false;
        }
        self
    }

    /// Returns the policy configuration, taking the observation shape from
    /// the camera if it is not set.
    pub fn policy_config(&self) -> MlpPolicyConfig {
        match self.policy.expected_shape {
            Some(_) => self.policy.clone(),
            None => {
                let shape = [
                    self.env.image_height as usize,
                    self.env.image_width as usize,
                    3,
                ];
                self.policy.clone().expected_shape(Some(shape))
            }
        }
    }
}
