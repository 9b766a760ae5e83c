use clap::{Parser, ValueEnum};

/// What the process does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Run the policy in the simulator.
    Eval,

    /// Print the effective configuration.
    ShowConfig,

    /// Write a randomly initialized policy.
    InitPolicy,
}

/// Evaluate a driving policy in the simulator
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// What to do
    #[arg(long, value_enum, default_value_t = Mode::Eval)]
    pub mode: Mode,

    /// YAML configuration, defaults are used if not given
    #[arg(long)]
    pub config: Option<String>,

    /// File of the policy weights
    #[arg(long)]
    pub model: Option<String>,

    /// Existing directory the camera frames are written to
    #[arg(long)]
    pub frames_dir: Option<String>,

    /// Do not write camera frames
    #[arg(long, default_value_t = false)]
    pub no_frames: bool,

    /// Number of episodes, runs until interrupted if not given
    #[arg(long)]
    pub episodes: Option<usize>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<i64>,

    /// Write telemetry to TensorBoard event files in this directory
    #[arg(long)]
    pub tensorboard: Option<String>,

    /// End episodes only by collision or disconnection
    #[arg(long, default_value_t = false)]
    pub no_time_limit: bool,
}
