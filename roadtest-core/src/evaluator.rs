//! Evaluation loop driving a [`Policy`] in an [`Env`].
mod config;
mod episode;
use crate::{
    error::CoreError,
    record::{Record, RecordValue, Recorder},
    Act, Env, FpsTracker, FrameStore, Policy, Termination,
};
use anyhow::Result;
use chrono::Local;
pub use config::EvalConfig;
pub use episode::{EpisodeState, EpisodeSummary, EvalSummary};
use log::{info, warn};
use std::time::Instant;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs episodes of a greedy policy in an environment.
///
/// Each episode goes through the states of [`EpisodeState`]:
///
/// ```mermaid
/// stateDiagram-v2
///     [*] --> Start
///     Start --> Running: reset
///     Running --> Running: step
///     Running --> Crashed: collision
///     Running --> TimedOut: time limit
///     Running --> Disconnected: no frames
///     Crashed --> Running: reset
///     TimedOut --> Running: reset
///     Disconnected --> [*]
/// ```
///
/// In every step the loop
///
/// 1. asks the policy for the action-values of the current observation,
/// 2. takes the action with the highest value (no exploration),
/// 3. steps the environment,
/// 4. hands the pre-step observation to the [`FrameStore`] under a frame index
///    increasing over the whole life of the loop,
/// 5. pushes the duration of the step into an [`FpsTracker`],
/// 6. writes a [`Record`] with `frame`, `episode`, `step`, `fps`, `action`,
///    `reward` and `action_values` (merged with the record of the environment)
///    to the [`Recorder`].
///
/// A terminal step ends the episode; the environment releases its resources and
/// the next episode starts. A [`Termination::Disconnected`] episode, a failing
/// policy and a reset failing more than [`EvalConfig::max_reset_attempts`] times
/// are fatal and stop the loop with an error.
pub struct EvalLoop<E, P>
where
    E: Env,
    P: Policy<E>,
{
    config: EvalConfig,
    env: E,
    policy: P,
    fps: FpsTracker,

    /// Index given to the next persisted frame.
    frame_index: u64,

    /// Index given to the first frame of the loop.
    start_frame: u64,

    /// Index of the next episode.
    episode: usize,

    warmed_up: bool,
}

impl<E, P> EvalLoop<E, P>
where
    E: Env,
    P: Policy<E>,
{
    /// Builds the environment and constructs the loop.
    pub fn new(env_config: &E::Config, seed: i64, config: EvalConfig, policy: P) -> Result<Self> {
        let env = E::build(env_config, seed)?;
        Ok(Self::with_env(env, config, policy))
    }

    /// Constructs the loop with an environment built beforehand.
    pub fn with_env(env: E, config: EvalConfig, policy: P) -> Self {
        let fps = FpsTracker::new(config.fps_window.max(1));
        Self {
            config,
            env,
            policy,
            fps,
            frame_index: 0,
            start_frame: 0,
            episode: 0,
            warmed_up: false,
        }
    }

    /// Sets the index of the next persisted frame.
    ///
    /// Used to continue the numbering of frames stored by an earlier process.
    pub fn first_frame(mut self, index: u64) -> Self {
        self.frame_index = index;
        self.start_frame = index;
        self
    }

    /// Returns the environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Returns the environment.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Returns the policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Returns the FPS tracker.
    pub fn fps(&self) -> &FpsTracker {
        &self.fps
    }

    /// Returns the index the next persisted frame will get.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Runs episodes until [`EvalConfig::max_episodes`] is reached.
    ///
    /// Without a limit this only returns on a fatal error.
    pub fn run<R, F>(&mut self, recorder: &mut R, frames: &mut F) -> Result<EvalSummary>
    where
        R: Recorder,
        F: FrameStore<E::Obs>,
    {
        let mut summary = EvalSummary::default();

        if !self.warmed_up {
            self.policy.warmup()?;
            self.warmed_up = true;
        }

        while self.config.max_episodes.map_or(true, |n| summary.episodes < n) {
            info!("Restarting episode");
            let episode = self.run_episode(recorder, frames)?;
            summary.add(&episode);
            summary.frames = self.frame_index - self.start_frame;
            recorder.flush();
        }

        Ok(summary)
    }

    /// Runs a single episode.
    pub fn run_episode<R, F>(&mut self, recorder: &mut R, frames: &mut F) -> Result<EpisodeSummary>
    where
        R: Recorder,
        F: FrameStore<E::Obs>,
    {
        let result = self.run_episode_inner(recorder, frames);
        if result.is_err() {
            self.env.close();
        }
        result
    }

    fn run_episode_inner<R, F>(&mut self, recorder: &mut R, frames: &mut F) -> Result<EpisodeSummary>
    where
        R: Recorder,
        F: FrameStore<E::Obs>,
    {
        let episode = self.episode;
        self.episode += 1;

        let started = Instant::now();
        let first_frame = self.frame_index;
        let mut obs = self.reset_with_retry()?;
        let mut state = EpisodeState::Start.begin();
        let mut total_reward = 0f32;

        let outcome = loop {
            let step_start = Instant::now();

            let values = self.policy.action_values(&obs)?;
            validate_action_values::<E>(&values)?;
            let ix = greedy(&values);
            let act = <E::Act as Act>::from_index(ix);
            let (step, env_record) = self.env.step(&act)?;

            if self.config.persist_frames {
                frames.store(self.frame_index, &obs)?;
            }
            let frame = self.frame_index;
            self.frame_index += 1;

            self.fps.push(step_start.elapsed());
            let fps = self.fps.fps();
            total_reward += step.reward;
            state = state.advance(step.termination);

            info!("Agent: {:>4.1} FPS | Action: {} {}", fps, fmt_values(&values), ix);

            let mut record = Record::from_slice(&[
                ("frame", RecordValue::Scalar(frame as f32)),
                ("episode", RecordValue::Scalar(episode as f32)),
                ("step", RecordValue::Scalar(state.steps() as f32)),
                ("fps", RecordValue::Scalar(fps)),
                ("action", RecordValue::Scalar(ix as f32)),
                ("reward", RecordValue::Scalar(step.reward)),
            ]);
            record.insert("action_values", RecordValue::Array1(values));
            recorder.write(record.merge(env_record));

            if let Some(termination) = state.termination() {
                break termination;
            }
            obs = step.obs;
        };

        self.env.close();

        let summary = EpisodeSummary {
            episode,
            steps: state.steps(),
            total_reward,
            outcome,
            elapsed: started.elapsed(),
            first_frame,
        };
        info!(
            "Episode {} {} after {} steps, return = {}",
            episode, outcome, summary.steps, total_reward
        );

        let mut record = Record::from_scalar("episode_return", total_reward);
        record.insert("frame", RecordValue::Scalar(self.frame_index as f32));
        record.insert("episode", RecordValue::Scalar(episode as f32));
        record.insert("outcome", RecordValue::String(outcome.to_string()));
        record.insert("time", RecordValue::DateTime(Local::now()));
        recorder.write(record);

        if outcome == Termination::Disconnected {
            return Err(CoreError::SimulatorDisconnected {
                episode,
                steps: summary.steps,
            }
            .into());
        }

        Ok(summary)
    }

    fn reset_with_retry(&mut self) -> Result<E::Obs> {
        let attempts = self.config.max_reset_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.env.reset() {
                Ok(obs) => return Ok(obs),
                Err(e) if attempt < attempts => {
                    warn!("Reset failed (attempt {}/{}): {:#}", attempt, attempts, e);
                    attempt += 1;
                }
                Err(e) => return Err(e.context(format!("Reset failed {} times", attempts))),
            }
        }
    }
}

/// Returns the index of the largest value; the first one wins on ties.
///
/// # Panics
///
/// Panics if `values` is empty.
pub fn greedy(values: &[f32]) -> usize {
    assert!(!values.is_empty(), "no action-values to choose from");
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn validate_action_values<E: Env>(values: &[f32]) -> Result<(), CoreError> {
    let reason = if values.len() != <E::Act as Act>::N_ACTIONS {
        format!(
            "expected {} action-values, got {}",
            <E::Act as Act>::N_ACTIONS,
            values.len()
        )
    } else if values.iter().any(|v| !v.is_finite()) {
        "non-finite action-value".to_string()
    } else {
        return Ok(());
    };
    Err(CoreError::PolicyOutput {
        reason,
        values: values.to_vec(),
    })
}

fn fmt_values(values: &[f32]) -> String {
    let values = values
        .iter()
        .map(|v| format!("{:>5.2}", v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", values)
}
