#![warn(missing_docs)]
//! Driving simulator environment for roadtest.
//!
//! [`DriveEnv`] turns a frame-driven [`Simulator`], which delivers camera images
//! and collision events through callbacks, into the synchronous
//! [`Env`](roadtest_core::Env) interface of `roadtest-core`. Camera frames go
//! through a single-slot [`SensorFrameBuffer`], collisions into a
//! [`CollisionMonitor`].
//!
//! [`Sandbox`] is a small kinematic simulator implementing [`Simulator`].
//!
//! ```no_run
//! use anyhow::Result;
//! use roadtest_core::{record::NullRecorder, EvalConfig, EvalLoop, NullFrameStore, Policy};
//! use roadtest_sim_env::{CameraObs, DriveEnv, DriveEnvConfig, Sandbox, SandboxConfig};
//!
//! type Env = DriveEnv<Sandbox>;
//!
//! struct Straight;
//!
//! impl Policy<Env> for Straight {
//!     fn action_values(&mut self, _obs: &CameraObs) -> Result<Vec<f32>> {
//!         Ok(vec![0.0, 1.0, 0.0])
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let env_config = DriveEnvConfig::<SandboxConfig>::default();
//!     let config = EvalConfig::default().max_episodes(Some(3));
//!     let mut eval = EvalLoop::<Env, _>::new(&env_config, 42, config, Straight)?;
//!     let summary = eval.run(&mut NullRecorder::new(), &mut NullFrameStore)?;
//!     println!("{:?}", summary);
//!     Ok(())
//! }
//! ```
mod act;
mod buffer;
mod collision;
mod env;
pub mod error;
mod frame_store;
mod obs;
mod sandbox;
pub mod sim;

pub use act::{ActionMapper, DriveAct};
pub use buffer::SensorFrameBuffer;
pub use collision::{CollisionMonitor, CollisionSink};
pub use env::{DriveEnv, DriveEnvConfig, DriveInfo, RewardConfig};
pub use error::{DriveEnvError, SimError};
pub use frame_store::PngFrameStore;
pub use obs::CameraObs;
pub use sandbox::{Sandbox, SandboxConfig, SyncMode};
pub use sim::Simulator;
