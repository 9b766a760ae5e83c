//! Episode lifecycle.
use crate::Termination;
use std::time::Duration;

/// State of an episode in the evaluation loop.
///
/// `Start -> Running -> {Crashed, TimedOut, Disconnected} -> Running (next episode)`.
/// Every ended state remembers the number of steps taken, so the reason an
/// episode stopped is attributable without inspecting the last [`Step`](crate::Step).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    /// No step taken yet.
    Start,

    /// The episode is in progress.
    Running {
        /// Steps taken so far.
        steps: usize,
    },

    /// The vehicle collided.
    Crashed {
        /// Steps taken in the episode.
        steps: usize,
    },

    /// The time limit of the episode was reached.
    TimedOut {
        /// Steps taken in the episode.
        steps: usize,
    },

    /// The simulator stopped delivering observations.
    Disconnected {
        /// Steps taken in the episode.
        steps: usize,
    },
}

impl Default for EpisodeState {
    fn default() -> Self {
        Self::Start
    }
}

impl EpisodeState {
    /// Enters a new episode.
    ///
    /// # Panics
    ///
    /// Panics if the episode is still running.
    pub fn begin(self) -> Self {
        match self {
            Self::Running { .. } => panic!("begin() called on a running episode"),
            _ => Self::Running { steps: 0 },
        }
    }

    /// Accounts for one step, ending the episode if `termination` is set.
    ///
    /// # Panics
    ///
    /// Panics if the episode is not running.
    pub fn advance(self, termination: Option<Termination>) -> Self {
        let steps = match self {
            Self::Running { steps } => steps + 1,
            other => panic!("advance() called in state {:?}", other),
        };
        match termination {
            None => Self::Running { steps },
            Some(Termination::Crashed) => Self::Crashed { steps },
            Some(Termination::TimedOut) => Self::TimedOut { steps },
            Some(Termination::Disconnected) => Self::Disconnected { steps },
        }
    }

    /// Returns the number of steps taken in the episode.
    pub fn steps(&self) -> usize {
        match *self {
            Self::Start => 0,
            Self::Running { steps }
            | Self::Crashed { steps }
            | Self::TimedOut { steps }
            | Self::Disconnected { steps } => steps,
        }
    }

    /// Returns the reason the episode ended, if it did.
    pub fn termination(&self) -> Option<Termination> {
        match self {
            Self::Crashed { .. } => Some(Termination::Crashed),
            Self::TimedOut { .. } => Some(Termination::TimedOut),
            Self::Disconnected { .. } => Some(Termination::Disconnected),
            Self::Start | Self::Running { .. } => None,
        }
    }

    /// Returns `true` while the episode is in progress.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Summary of one finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    /// Index of the episode, starting from 0.
    pub episode: usize,

    /// Steps taken in the episode.
    pub steps: usize,

    /// Sum of the rewards.
    pub total_reward: f32,

    /// Why the episode ended.
    pub outcome: Termination,

    /// Wall-clock duration of the episode, reset included.
    pub elapsed: Duration,

    /// Index of the first frame persisted in the episode.
    pub first_frame: u64,
}

/// Summary of an evaluation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalSummary {
    /// Number of finished episodes.
    pub episodes: usize,

    /// Total number of steps.
    pub steps: usize,

    /// Episodes ended by a collision.
    pub crashed: usize,

    /// Episodes ended by the time limit.
    pub timed_out: usize,

    /// Number of frames observed by the loop since it was built.
    pub frames: u64,
}

impl EvalSummary {
    pub(super) fn add(&mut self, episode: &EpisodeSummary) {
        self.episodes += 1;
        self.steps += episode.steps;
        match episode.outcome {
            Termination::Crashed => self.crashed += 1,
            Termination::TimedOut => self.timed_out += 1,
            Termination::Disconnected => {}
        }
    }
}
