#![warn(missing_docs)]
//! A Q-network policy for roadtest which runs without a deep learning backend.
//!
//! [`MlpPolicy`] average-pools the scaled camera image, flattens it and feeds
//! it to a small [`Mlp`] whose outputs are the action-values. Networks are
//! stored with `bincode`.
//!
//! ```no_run
//! # use anyhow::Result;
//! use roadtest_policy_no_backend::{MlpPolicy, MlpPolicyConfig};
//!
//! # fn main() -> Result<()> {
//! let config = MlpPolicyConfig::default()
//!     .model_path("model/policy.bin")
//!     .expected_shape(Some([480, 640, 3]));
//! let policy = MlpPolicy::random(config.clone(), 3, 42)?;
//! policy.save(&config.model_path)?;
//!
//! let loaded = MlpPolicy::load(config)?;
//! assert_eq!(loaded.mlp(), policy.mlp());
//! # Ok(())
//! # }
//! ```
mod error;
mod mat;
mod mlp;
mod policy;
pub use error::PolicyError;
pub use mat::Mat;
pub use mlp::Mlp;
pub use policy::{MlpPolicy, MlpPolicyConfig};
