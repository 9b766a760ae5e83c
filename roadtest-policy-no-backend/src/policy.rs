use crate::{Mat, Mlp, PolicyError};
use anyhow::{Context, Result};
use log::info;
use roadtest_core::{Configurable, Env, Obs, Policy};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`MlpPolicy`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MlpPolicyConfig {
    /// File of the network, as written by [`MlpPolicy::save`].
    pub model_path: String,

    /// Side of the square window averaged into one input of the network.
    pub pool: usize,

    /// Shape of the observations, `[height, width, channels]`. Checked at
    /// every call if set.
    pub expected_shape: Option<[usize; 3]>,

    /// Hidden dimensions of a randomly initialized network.
    pub hidden_dims: Vec<usize>,
}

impl Default for MlpPolicyConfig {
    fn default() -> Self {
        Self {
            model_path: "model/policy.bin".to_string(),
            pool: 8,
            expected_shape: Some([480, 640, 3]),
            hidden_dims: vec![64],
        }
    }
}

impl MlpPolicyConfig {
    /// Sets the model file.
    pub fn model_path(mut self, v: impl Into<String>) -> Self {
        self.model_path = v.into();
        self
    }

    /// Sets the pooling factor.
    pub fn pool(mut self, v: usize) -> Self {
        self.pool = v;
        self
    }

    /// Sets the shape of the observations.
    pub fn expected_shape(mut self, v: Option<[usize; 3]>) -> Self {
        self.expected_shape = v;
        self
    }

    /// Sets the hidden dimensions of a randomly initialized network.
    pub fn hidden_dims(mut self, v: Vec<usize>) -> Self {
        self.hidden_dims = v;
        self
    }

    /// Constructs [`MlpPolicyConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(config)
    }

    /// Saves [`MlpPolicyConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Returns the number of inputs of the network for an observation shape.
fn pooled_dim(shape: [usize; 3], pool: usize) -> Result<usize, PolicyError> {
    let [h, w, c] = shape;
    let pool = pool.max(1);
    if h < pool || w < pool {
        return Err(PolicyError::Pooling { pool, shape });
    }
    Ok((h / pool) * (w / pool) * c)
}

/// Averages the scaled values of `obs` over `pool x pool` windows.
///
/// Rows and columns which do not fill a window are ignored. The result is
/// flattened in `HWC` order.
fn average_pool<O: Obs>(obs: &O, pool: usize) -> Result<Vec<f32>, PolicyError> {
    let shape = obs.shape();
    let [h, w, c] = shape;
    let pool = pool.max(1);
    let values = obs.to_scaled();
    if pool == 1 {
        return Ok(values);
    }

    let (ph, pw) = (h / pool, w / pool);
    if ph == 0 || pw == 0 {
        return Err(PolicyError::Pooling { pool, shape });
    }
    let mut pooled = vec![0f32; ph * pw * c];
    for y in 0..ph * pool {
        for x in 0..pw * pool {
            let src = (y * w + x) * c;
            let dst = ((y / pool) * pw + x / pool) * c;
            for ch in 0..c {
                pooled[dst + ch] += values[src + ch];
            }
        }
    }
    let n = (pool * pool) as f32;
    pooled.iter_mut().for_each(|v| *v /= n);
    Ok(pooled)
}

/// A Q-network policy running an [`Mlp`] on average-pooled observations.
///
/// The network is loaded once when the policy is built.
#[derive(Debug, Clone)]
pub struct MlpPolicy {
    config: MlpPolicyConfig,
    mlp: Mlp,
}

impl MlpPolicy {
    /// Constructs the policy with a given network.
    pub fn new(config: MlpPolicyConfig, mlp: Mlp) -> Result<Self> {
        if let Some(shape) = config.expected_shape {
            let got = pooled_dim(shape, config.pool)?;
            if got != mlp.input_dim() {
                return Err(PolicyError::InputDim {
                    expected: mlp.input_dim(),
                    got,
                }
                .into());
            }
        }
        Ok(Self { config, mlp })
    }

    /// Constructs a policy with a randomly initialized network.
    ///
    /// Requires [`MlpPolicyConfig::expected_shape`].
    pub fn random(config: MlpPolicyConfig, n_actions: usize, seed: u64) -> Result<Self> {
        let shape = config.expected_shape.ok_or(PolicyError::MissingShape)?;
        let mut dims = vec![pooled_dim(shape, config.pool)?];
        dims.extend_from_slice(&config.hidden_dims);
        dims.push(n_actions);
        let mlp = Mlp::random(&dims, seed)?;
        Self::new(config, mlp)
    }

    /// Loads the network from [`MlpPolicyConfig::model_path`].
    pub fn load(config: MlpPolicyConfig) -> Result<Self> {
        let mlp = Mlp::load(&config.model_path)
            .with_context(|| format!("Failed to load the policy from {}", config.model_path))?;
        info!(
            "Loaded policy with {} inputs and {} outputs from {}",
            mlp.input_dim(),
            mlp.output_dim(),
            config.model_path
        );
        Self::new(config, mlp)
    }

    /// Saves the network, to be loaded with a config whose `model_path` is `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.mlp.save(path)
    }

    /// Returns the network.
    pub fn mlp(&self) -> &Mlp {
        &self.mlp
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MlpPolicyConfig {
        &self.config
    }

    fn forward<O: Obs>(&self, obs: &O) -> Result<Vec<f32>, PolicyError> {
        if let Some(expected) = self.config.expected_shape {
            let got = obs.shape();
            if got != expected {
                return Err(PolicyError::ObsShape { expected, got });
            }
        }
        let x = average_pool(obs, self.config.pool)?;
        if x.len() != self.mlp.input_dim() {
            return Err(PolicyError::InputDim {
                expected: self.mlp.input_dim(),
                got: x.len(),
            });
        }
        Ok(self.mlp.forward(&x.into())?.into_data())
    }
}

impl<E: Env> Policy<E> for MlpPolicy {
    fn action_values(&mut self, obs: &E::Obs) -> Result<Vec<f32>> {
        Ok(self.forward(obs)?)
    }

    /// Runs the network once, so the first step is not slower than the others.
    fn warmup(&mut self) -> Result<()> {
        let x = Mat::zeros(self.mlp.input_dim(), 1);
        self.mlp.forward(&x)?;
        Ok(())
    }
}

impl<E: Env> Configurable<E> for MlpPolicy {
    type Config = MlpPolicyConfig;

    fn build(config: Self::Config) -> Result<Self> {
        Self::load(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Image {
        shape: [usize; 3],
        values: Vec<f32>,
    }

    impl Obs for Image {
        fn shape(&self) -> [usize; 3] {
            self.shape
        }

        fn to_scaled(&self) -> Vec<f32> {
            self.values.clone()
        }
    }

    #[test]
    fn pools_windows_in_hwc_order() -> Result<()> {
        // 2x4 image with one channel, pooled by 2 into 1x2.
        let obs = Image {
            shape: [2, 4, 1],
            values: vec![0.0, 0.2, 1.0, 1.0, 0.4, 0.2, 0.0, 0.0],
        };
        let pooled = average_pool(&obs, 2)?;
        assert_eq!(pooled.len(), 2);
        assert!((pooled[0] - 0.2).abs() < 1e-6);
        assert!((pooled[1] - 0.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn pooling_ignores_partial_windows() -> Result<()> {
        let obs = Image {
            shape: [3, 3, 2],
            values: (0..18).map(|v| v as f32).collect(),
        };
        // Only the top-left 2x2 window: pixels 0, 1, 3, 4.
        let pooled = average_pool(&obs, 2)?;
        assert_eq!(pooled, vec![4.0, 5.0]);
        assert_eq!(pooled_dim(obs.shape, 2)?, 2);
        assert!(average_pool(&obs, 4).is_err());
        Ok(())
    }

    #[test]
    fn random_policy_fits_the_observation() -> Result<()> {
        let config = MlpPolicyConfig::default()
            .expected_shape(Some([8, 8, 3]))
            .pool(4)
            .hidden_dims(vec![5]);
        let policy = MlpPolicy::random(config, 3, 7)?;
        assert_eq!(policy.mlp().input_dim(), 2 * 2 * 3);
        assert_eq!(policy.mlp().output_dim(), 3);

        let obs = Image {
            shape: [8, 8, 3],
            values: vec![0.5; 8 * 8 * 3],
        };
        assert_eq!(policy.forward(&obs)?.len(), 3);

        let other = Image {
            shape: [4, 4, 3],
            values: vec![0.5; 4 * 4 * 3],
        };
        assert!(matches!(
            policy.forward(&other),
            Err(PolicyError::ObsShape { .. })
        ));
        Ok(())
    }

    #[test]
    fn mismatched_network_is_rejected() -> Result<()> {
        let config = MlpPolicyConfig::default().expected_shape(Some([8, 8, 3])).pool(4);
        let mlp = Mlp::random(&[10, 3], 0)?;
        assert!(MlpPolicy::new(config, mlp).is_err());
        Ok(())
    }
}
