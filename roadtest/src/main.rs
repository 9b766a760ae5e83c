mod args;
mod config;
use anyhow::Result;
use args::{Args, Mode};
use clap::Parser;
use config::RoadtestConfig;
use log::info;
use roadtest_core::{
    record::{NullRecorder, Recorder},
    Act, Configurable, EvalLoop, FrameStore, NullFrameStore,
};
use roadtest_policy_no_backend::MlpPolicy;
use roadtest_sim_env::{CameraObs, DriveAct, DriveEnv, PngFrameStore, Sandbox};
use roadtest_tensorboard::TensorboardRecorder;
use std::path::Path;

type Env = DriveEnv<Sandbox>;

fn create_recorder(config: &RoadtestConfig) -> Box<dyn Recorder> {
    match &config.tensorboard {
        Some(logdir) => {
            info!("Write telemetry to {}", logdir);
            Box::new(TensorboardRecorder::new(logdir))
        }
        None => Box::new(NullRecorder::new()),
    }
}

/// Returns the frame store and the index of its first new frame.
fn create_frame_store(config: &RoadtestConfig) -> Result<(Box<dyn FrameStore<CameraObs>>, u64)> {
    if !config.eval.persist_frames {
        let store: Box<dyn FrameStore<CameraObs>> = Box::new(NullFrameStore);
        return Ok((store, 0));
    }
    let store = PngFrameStore::new(&config.frames_dir)?;
    let first_frame = store.next_index();
    let store: Box<dyn FrameStore<CameraObs>> = Box::new(store);
    Ok((store, first_frame))
}

fn eval(config: &RoadtestConfig) -> Result<()> {
    // The frame directory is checked before connecting to the simulator.
    let (mut frames, first_frame) = create_frame_store(config)?;
    let mut recorder = create_recorder(config);
    let policy = <MlpPolicy as Configurable<Env>>::build(config.policy_config())?;
    let mut evaluator =
        EvalLoop::<Env, _>::new(&config.env, config.seed, config.eval.clone(), policy)?
            .first_frame(first_frame);

    let result = evaluator.run(&mut recorder, &mut frames);
    recorder.flush();
    let summary = result?;
    info!(
        "Finished {} episodes, {} steps: {} crashed, {} timed out",
        summary.episodes, summary.steps, summary.crashed, summary.timed_out
    );
    Ok(())
}

fn show_config(config: &RoadtestConfig) -> Result<()> {
    println!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn init_policy(config: &RoadtestConfig) -> Result<()> {
    let policy_config = config.policy_config();
    let policy = MlpPolicy::random(
        policy_config.clone(),
        <DriveAct as Act>::N_ACTIONS,
        config.seed as u64,
    )?;
    if let Some(dir) = Path::new(&policy_config.model_path).parent() {
        std::fs::create_dir_all(dir)?;
    }
    policy.save(&policy_config.model_path)?;
    info!("Initialized policy written to {}", policy_config.model_path);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => RoadtestConfig::load(path)?,
        None => RoadtestConfig::default(),
    }
    .with_args(&args);

    match args.mode {
        Mode::Eval => eval(&config),
        Mode::ShowConfig => show_config(&config),
        Mode::InitPolicy => init_policy(&config),
    }
}
