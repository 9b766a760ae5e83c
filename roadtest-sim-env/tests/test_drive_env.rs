use anyhow::Result;
use roadtest_core::{
    record::BufferedRecorder, Act, Env, EvalConfig, EvalLoop, Obs, Policy, Termination,
};
use roadtest_sim_env::{
    sim::{ActorId, Blueprint, CollisionEvent, ControlCommand, Mount, SensorCallback, Transform},
    CameraObs, DriveAct, DriveEnv, DriveEnvConfig, DriveEnvError, PngFrameStore, Sandbox,
    SandboxConfig, SimError, Simulator, SyncMode,
};
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};
use tempdir::TempDir;
use test_log::test;

fn env_config(sim: SandboxConfig) -> DriveEnvConfig<SandboxConfig> {
    DriveEnvConfig::default()
        .sim(sim)
        .image_size(80, 60)
        .first_frame_timeout_secs(2.0)
        .step_frame_timeout_secs(0.5)
}

fn build(config: &DriveEnvConfig<SandboxConfig>) -> Result<DriveEnv<Sandbox>> {
    DriveEnv::build(config, 42)
}

fn env_error(err: &anyhow::Error) -> &DriveEnvError {
    match err.downcast_ref::<DriveEnvError>() {
        Some(e) => e,
        None => panic!("unexpected error: {:?}", err),
    }
}

#[test]
fn reset_yields_a_frame_of_the_configured_shape() -> Result<()> {
    let config = env_config(SandboxConfig::default());
    let mut env = build(&config)?;

    let start = Instant::now();
    let obs = env.reset()?;
    assert!(start.elapsed() < Duration::from_secs(2));

    assert_eq!(obs.shape(), [60, 80, 3]);
    assert_eq!(obs.pixels().len(), 60 * 80 * 3);
    assert!(obs.pixels().iter().any(|&v| v != 0));
    assert!(env.has_episode());

    // Vehicle, camera and collision sensor.
    assert_eq!(env.simulator().live_actors(), 3);
    Ok(())
}

#[test]
fn collision_ends_the_episode_whatever_the_action() -> Result<()> {
    // An obstacle on every spawn point.
    let sim = SandboxConfig::default();
    let obstacles = sim.spawn_points.clone();
    let config = env_config(sim.obstacles(obstacles));
    let mut env = build(&config)?;

    for ix in 0..DriveAct::N_ACTIONS {
        env.reset()?;
        let (step, _) = env.step(&DriveAct::from_index(ix))?;
        assert_eq!(step.termination, Some(Termination::Crashed));
        assert_eq!(step.reward, -200.0);
        assert!(!env.has_episode());
        assert_eq!(env.simulator().live_actors(), 0);
    }
    Ok(())
}

#[test]
fn delivered_collision_is_scored_in_the_next_step() -> Result<()> {
    let config = env_config(SandboxConfig::default()).time_limit(false);
    let mut env = build(&config)?;
    env.reset()?;

    let (step, _) = env.step(&DriveAct::STRAIGHT)?;
    assert_eq!(step.termination, None);

    env.collision_monitor().record(CollisionEvent {
        frame: step.info.frame,
        other_actor: Some("vehicle.audi.tt".to_string()),
    });
    let (step, _) = env.step(&DriveAct::LEFT)?;
    assert_eq!(step.termination, Some(Termination::Crashed));
    assert_eq!(step.reward, config.reward.collision_penalty);
    Ok(())
}

#[test]
fn collisions_of_a_previous_episode_are_forgotten() -> Result<()> {
    let config = env_config(SandboxConfig::default()).time_limit(false);
    let mut env = build(&config)?;
    env.reset()?;
    env.collision_monitor().record(CollisionEvent {
        frame: 0,
        other_actor: None,
    });

    env.reset()?;
    assert!(!env.collision_monitor().has_collided());
    let (step, _) = env.step(&DriveAct::STRAIGHT)?;
    assert_eq!(step.termination, None);
    Ok(())
}

#[test]
fn episode_times_out_and_releases_its_actors() -> Result<()> {
    let config = env_config(SandboxConfig::default()).seconds_per_episode(0.2);
    let mut env = build(&config)?;
    env.reset()?;

    let start = Instant::now();
    let step = loop {
        let (step, _) = env.step(&DriveAct::STRAIGHT)?;
        if step.is_done() {
            break step;
        }
        assert!(start.elapsed() < Duration::from_secs(30));
        assert!(step.reward == -1.0 || step.reward == 1.0);
    };

    assert_eq!(step.termination, Some(Termination::TimedOut));
    assert_eq!(step.reward, 0.0);
    assert!(!env.has_episode());
    assert_eq!(env.simulator().live_actors(), 0);
    Ok(())
}

#[test]
fn speed_shapes_the_reward() -> Result<()> {
    let sim = SandboxConfig::default().delta_seconds(0.5);
    let config = env_config(sim).time_limit(false);
    let mut env = build(&config)?;
    env.reset()?;

    // 3 m/s after the first step.
    let (step, record) = env.step(&DriveAct::STRAIGHT)?;
    assert_eq!(step.reward, -1.0);
    assert!(step.info.speed_kmh < 50.0);
    assert_eq!(record.get_scalar("speed_kmh")?, step.info.speed_kmh);

    // Full throttle reaches 50 km/h within 3 s.
    let mut last = step;
    for _ in 0..10 {
        last = env.step(&DriveAct::STRAIGHT)?.0;
    }
    assert!(last.info.speed_kmh >= 50.0);
    assert_eq!(last.reward, 1.0);
    Ok(())
}

#[test]
fn without_time_limit_episodes_do_not_time_out() -> Result<()> {
    let config = env_config(SandboxConfig::default())
        .seconds_per_episode(0.0)
        .time_limit(false);
    let mut env = build(&config)?;
    env.reset()?;
    for _ in 0..5 {
        let (step, _) = env.step(&DriveAct::STRAIGHT)?;
        assert!(!step.is_done());
    }
    Ok(())
}

#[test]
fn frames_increase_within_an_episode() -> Result<()> {
    let config = env_config(SandboxConfig::default()).time_limit(false);
    let mut env = build(&config)?;
    let mut frame = env.reset()?.frame();
    for _ in 0..20 {
        let (step, _) = env.step(&DriveAct::STRAIGHT)?;
        assert!(step.obs.frame() > frame);
        frame = step.obs.frame();
    }
    Ok(())
}

#[test]
fn asynchronous_world_serves_fresh_frames() -> Result<()> {
    let sim = SandboxConfig::default().mode(SyncMode::Asynchronous { fps: 100.0 });
    let config = env_config(sim).time_limit(false);
    let mut env = build(&config)?;
    let mut frame = env.reset()?.frame();
    for _ in 0..10 {
        let (step, _) = env.step(&DriveAct::STRAIGHT)?;
        assert!(step.obs.frame() > frame);
        assert_eq!(step.info.stale_steps, 0);
        frame = step.obs.frame();
    }
    env.close();
    assert_eq!(env.simulator().live_actors(), 0);
    Ok(())
}

#[test]
fn spawn_retries_on_occupied_points() -> Result<()> {
    let sim = SandboxConfig::default().occupied_spawn_points(vec![0, 1, 2]);
    let mut env = build(&env_config(sim))?;
    for _ in 0..3 {
        env.reset()?;
        assert_eq!(env.simulator().live_actors(), 3);
    }
    Ok(())
}

#[test]
fn reset_fails_when_every_spawn_point_is_occupied() -> Result<()> {
    let sim = SandboxConfig::default().occupied_spawn_points(vec![0, 1, 2, 3]);
    let mut env = build(&env_config(sim))?;

    let err = env.reset().unwrap_err();
    assert!(matches!(env_error(&err), DriveEnvError::NoFreeSpawnPoint(4)));
    assert!(!env.has_episode());
    assert_eq!(env.simulator().live_actors(), 0);
    Ok(())
}

#[test]
fn reset_fails_without_spawn_points() -> Result<()> {
    let sim = SandboxConfig::default().spawn_points(vec![]);
    let mut env = build(&env_config(sim))?;
    let err = env.reset().unwrap_err();
    assert!(matches!(env_error(&err), DriveEnvError::NoSpawnPoints));
    Ok(())
}

#[test]
fn silent_camera_times_out_the_reset_without_leaks() -> Result<()> {
    let sim = SandboxConfig::default().camera_blackout(true);
    let config = env_config(sim)
        .first_frame_timeout_secs(0.1)
        .step_frame_timeout_secs(0.02);
    let mut env = build(&config)?;

    let start = Instant::now();
    let err = env.reset().unwrap_err();
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert!(matches!(env_error(&err), DriveEnvError::SetupTimeout(_)));
    assert!(!env.has_episode());
    assert_eq!(env.simulator().live_actors(), 0);
    Ok(())
}

#[test]
fn delivery_gap_reuses_the_last_frame_then_disconnects() -> Result<()> {
    let config = env_config(SandboxConfig::default())
        .time_limit(false)
        .step_frame_timeout_secs(0.01)
        .max_stale_steps(2);
    let mut env = build(&config)?;
    let first = env.reset()?;
    env.simulator().set_camera_blackout(true);

    for stale in 1..=2 {
        let (step, _) = env.step(&DriveAct::STRAIGHT)?;
        assert_eq!(step.termination, None);
        assert_eq!(step.info.stale_steps, stale);
        assert_eq!(step.obs, first);
    }

    let (step, _) = env.step(&DriveAct::STRAIGHT)?;
    assert_eq!(step.termination, Some(Termination::Disconnected));
    assert_eq!(step.reward, 0.0);
    assert_eq!(env.simulator().live_actors(), 0);
    Ok(())
}

#[test]
fn step_without_reset_is_an_error() -> Result<()> {
    let mut env = build(&env_config(SandboxConfig::default()))?;
    let err = env.step(&DriveAct::STRAIGHT).err().unwrap();
    assert!(matches!(env_error(&err), DriveEnvError::NoEpisode));
    Ok(())
}

#[test]
fn unrepresentable_timeouts_are_rejected_at_build() {
    let invalid = [f32::INFINITY, f32::NAN, -1.0, 1e30];
    for &secs in &invalid {
        let config = env_config(SandboxConfig::default()).first_frame_timeout_secs(secs);
        let err = build(&config).err().unwrap();
        assert!(matches!(
            env_error(&err),
            DriveEnvError::InvalidTimeout {
                name: "first_frame_timeout_secs",
                ..
            }
        ));

        let config = env_config(SandboxConfig::default()).step_frame_timeout_secs(secs);
        let err = build(&config).err().unwrap();
        assert!(matches!(
            env_error(&err),
            DriveEnvError::InvalidTimeout {
                name: "step_frame_timeout_secs",
                ..
            }
        ));
    }
}

#[test]
fn close_is_idempotent() -> Result<()> {
    let mut env = build(&env_config(SandboxConfig::default()))?;
    env.reset()?;
    env.close();
    env.close();
    assert!(!env.has_episode());
    assert_eq!(env.simulator().live_actors(), 0);
    Ok(())
}

/// A [`Sandbox`] whose next `destroy()` can be made to fail.
struct FlakySim {
    inner: Sandbox,
    fail_next_destroy: bool,
}

impl Simulator for FlakySim {
    type Config = SandboxConfig;

    fn connect(config: &SandboxConfig) -> Result<Self, SimError> {
        Ok(Self {
            inner: Sandbox::connect(config)?,
            fail_next_destroy: false,
        })
    }

    fn spawn_points(&self) -> Vec<Transform> {
        self.inner.spawn_points()
    }

    fn blueprint(&self, id: &str) -> Result<Blueprint, SimError> {
        self.inner.blueprint(id)
    }

    fn spawn_vehicle(&mut self, bp: &Blueprint, at: &Transform) -> Result<ActorId, SimError> {
        self.inner.spawn_vehicle(bp, at)
    }

    fn spawn_sensor(
        &mut self,
        bp: &Blueprint,
        mount: &Mount,
        parent: ActorId,
    ) -> Result<ActorId, SimError> {
        self.inner.spawn_sensor(bp, mount, parent)
    }

    fn listen(&mut self, sensor: ActorId, callback: SensorCallback) -> Result<(), SimError> {
        self.inner.listen(sensor, callback)
    }

    fn apply_control(
        &mut self,
        vehicle: ActorId,
        control: &ControlCommand,
    ) -> Result<(), SimError> {
        self.inner.apply_control(vehicle, control)
    }

    fn velocity(&self, vehicle: ActorId) -> Result<[f32; 3], SimError> {
        self.inner.velocity(vehicle)
    }

    fn tick(&mut self) -> Result<u64, SimError> {
        self.inner.tick()
    }

    fn destroy(&mut self, actor: ActorId) -> Result<(), SimError> {
        if self.fail_next_destroy {
            self.fail_next_destroy = false;
            return Err(SimError::Disconnected("destroy timed out".to_string()));
        }
        self.inner.destroy(actor)
    }
}

#[test]
fn failed_destroy_does_not_stop_the_teardown() -> Result<()> {
    let config: DriveEnvConfig<SandboxConfig> = env_config(SandboxConfig::default());
    let mut env = DriveEnv::<FlakySim>::build(&config, 0)?;
    env.reset()?;
    env.simulator_mut().fail_next_destroy = true;

    env.close();

    // The collision sensor, destroyed first, is left behind.
    assert!(!env.has_episode());
    assert_eq!(env.simulator().inner.live_actors(), 1);

    // The next episode starts regardless.
    env.reset()?;
    assert_eq!(env.simulator().inner.live_actors(), 4);
    Ok(())
}

/// Number of actors alive in every [`TrackedSim`].
static TRACKED_ACTORS: AtomicUsize = AtomicUsize::new(0);

/// A [`Sandbox`] counting its live actors in [`TRACKED_ACTORS`].
struct TrackedSim(Sandbox);

impl Simulator for TrackedSim {
    type Config = SandboxConfig;

    fn connect(config: &SandboxConfig) -> Result<Self, SimError> {
        Ok(Self(Sandbox::connect(config)?))
    }

    fn spawn_points(&self) -> Vec<Transform> {
        self.0.spawn_points()
    }

    fn blueprint(&self, id: &str) -> Result<Blueprint, SimError> {
        self.0.blueprint(id)
    }

    fn spawn_vehicle(&mut self, bp: &Blueprint, at: &Transform) -> Result<ActorId, SimError> {
        let id = self.0.spawn_vehicle(bp, at)?;
        TRACKED_ACTORS.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn spawn_sensor(
        &mut self,
        bp: &Blueprint,
        mount: &Mount,
        parent: ActorId,
    ) -> Result<ActorId, SimError> {
        let id = self.0.spawn_sensor(bp, mount, parent)?;
        TRACKED_ACTORS.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn listen(&mut self, sensor: ActorId, callback: SensorCallback) -> Result<(), SimError> {
        self.0.listen(sensor, callback)
    }

    fn apply_control(
        &mut self,
        vehicle: ActorId,
        control: &ControlCommand,
    ) -> Result<(), SimError> {
        self.0.apply_control(vehicle, control)
    }

    fn velocity(&self, vehicle: ActorId) -> Result<[f32; 3], SimError> {
        self.0.velocity(vehicle)
    }

    fn tick(&mut self) -> Result<u64, SimError> {
        self.0.tick()
    }

    fn destroy(&mut self, actor: ActorId) -> Result<(), SimError> {
        self.0.destroy(actor)?;
        TRACKED_ACTORS.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn dropping_the_env_releases_the_episode() -> Result<()> {
    let config = env_config(SandboxConfig::default());
    {
        let mut env = DriveEnv::<TrackedSim>::build(&config, 0)?;
        env.reset()?;
        assert_eq!(TRACKED_ACTORS.load(Ordering::SeqCst), 3);
    }
    assert_eq!(TRACKED_ACTORS.load(Ordering::SeqCst), 0);
    Ok(())
}

struct Straight;

impl Policy<DriveEnv<Sandbox>> for Straight {
    fn action_values(&mut self, _obs: &CameraObs) -> Result<Vec<f32>> {
        Ok(vec![0.1, 0.8, 0.1])
    }
}

#[test]
fn eval_loop_persists_every_frame_as_png() -> Result<()> {
    let dir = TempDir::new("drive_env_frames")?;
    let env_config = env_config(SandboxConfig::default()).seconds_per_episode(0.1);
    let config = EvalConfig::default().max_episodes(Some(2));
    let mut eval = EvalLoop::<DriveEnv<Sandbox>, _>::new(&env_config, 0, config, Straight)?;
    let mut frames = PngFrameStore::new(dir.path())?;
    let mut recorder = BufferedRecorder::new();

    let summary = eval.run(&mut recorder, &mut frames)?;

    assert_eq!(summary.episodes, 2);
    assert_eq!(summary.timed_out, 2);
    assert_eq!(summary.frames, summary.steps as u64);
    for i in 0..summary.frames {
        assert!(dir.path().join(format!("{}.png", i)).exists());
    }
    let files = std::fs::read_dir(dir.path())?.count() as u64;
    assert_eq!(files, summary.frames);
    assert_eq!(eval.env().simulator().live_actors(), 0);
    Ok(())
}

#[test]
fn second_run_into_the_same_directory_continues_the_numbering() -> Result<()> {
    let dir = TempDir::new("frames")?;
    let env_config = env_config(SandboxConfig::default()).seconds_per_episode(0.1);
    let config = EvalConfig::default().max_episodes(Some(1));

    let mut frames = PngFrameStore::new(dir.path())?;
    let mut first =
        EvalLoop::<DriveEnv<Sandbox>, _>::new(&env_config, 0, config.clone(), Straight)?
            .first_frame(frames.next_index());
    let n_first = first.run(&mut BufferedRecorder::new(), &mut frames)?.frames;
    drop(first);

    let mut frames = PngFrameStore::new(dir.path())?;
    assert_eq!(frames.next_index(), n_first);
    let mut second = EvalLoop::<DriveEnv<Sandbox>, _>::new(&env_config, 0, config, Straight)?
        .first_frame(frames.next_index());
    assert_eq!(second.frame_index(), n_first);
    let n_second = second.run(&mut BufferedRecorder::new(), &mut frames)?.frames;

    let files = std::fs::read_dir(dir.path())?.count() as u64;
    assert_eq!(files, n_first + n_second);
    for i in 0..files {
        assert!(dir.path().join(format!("{}.png", i)).exists());
    }
    Ok(())
}
