#![warn(missing_docs)]
//! Core of roadtest, an evaluation harness for driving policies.
//!
//! The crate defines the contract between a simulated environment ([`Env`]),
//! a policy emitting action-values ([`Policy`]) and the evaluation loop
//! ([`EvalLoop`]) which drives episodes, measures throughput with an
//! [`FpsTracker`], persists observed frames through a [`FrameStore`] and emits
//! per-step telemetry as [`Record`](record::Record)s.
pub mod error;
pub mod record;

mod base;
pub use base::{Act, Configurable, Env, Info, Obs, Policy, Step, Termination};

mod evaluator;
pub use evaluator::{greedy, EpisodeState, EpisodeSummary, EvalConfig, EvalLoop, EvalSummary};

mod fps;
pub use fps::FpsTracker;

mod frame_store;
pub use frame_store::{FrameStore, NullFrameStore};
