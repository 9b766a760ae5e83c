//! Environment adapter on a [`Simulator`].
mod config;
use crate::{
    error::{DriveEnvError, SimError},
    sim::{speed_kmh, ActorId, Blueprint, ControlCommand, Mount, SensorData, Simulator},
    ActionMapper, CameraObs, CollisionMonitor, DriveAct, SensorFrameBuffer,
};
use anyhow::Result;
pub use config::{DriveEnvConfig, RewardConfig};
use log::{debug, info, trace, warn};
use roadtest_core::{record::Record, Act, Env, Info, Step, Termination};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Auxiliary information of a step of [`DriveEnv`].
#[derive(Debug, Clone, PartialEq)]
pub struct DriveInfo {
    /// Simulator frame of the observation.
    pub frame: u64,

    /// Speed of the vehicle.
    pub speed_kmh: f32,

    /// Consecutive steps without a fresh frame.
    pub stale_steps: usize,

    /// Frames overwritten before the environment read them, since it was built.
    pub dropped_frames: u64,
}

impl Info for DriveInfo {}

/// Actors of a running episode.
struct Episode {
    vehicle: ActorId,

    /// In spawn order.
    actors: Vec<ActorId>,
}

/// A driving environment on a simulator.
///
/// An episode owns a vehicle with an RGB camera and a collision sensor. The
/// camera callback decodes each image and writes it into a
/// [`SensorFrameBuffer`], the collision callback appends to a
/// [`CollisionMonitor`]; [`Env::reset`] and [`Env::step`] wait on the buffer
/// with bounded timeouts.
///
/// The actors are destroyed at a terminal step, by [`Env::close`], by the next
/// reset and when the environment is dropped.
pub struct DriveEnv<S: Simulator> {
    config: DriveEnvConfig<S::Config>,
    sim: S,
    rng: fastrand::Rng,
    mapper: ActionMapper,
    frames: Arc<SensorFrameBuffer<CameraObs>>,
    collisions: Arc<CollisionMonitor>,
    episode: Option<Episode>,
    last_obs: Option<CameraObs>,
    stale_steps: usize,
    episode_start: Instant,
    first_frame_timeout: Duration,
    step_frame_timeout: Duration,
}

impl<S: Simulator> DriveEnv<S> {
    /// Returns the simulator.
    pub fn simulator(&self) -> &S {
        &self.sim
    }

    /// Returns the simulator.
    pub fn simulator_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// Returns the buffer receiving camera frames.
    pub fn frame_buffer(&self) -> &SensorFrameBuffer<CameraObs> {
        &self.frames
    }

    /// Returns the monitor receiving collisions.
    pub fn collision_monitor(&self) -> &CollisionMonitor {
        &self.collisions
    }

    /// Returns `true` while the actors of an episode are alive.
    pub fn has_episode(&self) -> bool {
        self.episode.is_some()
    }

    /// Returns the number of actions.
    pub fn n_actions(&self) -> usize {
        DriveAct::N_ACTIONS
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DriveEnvConfig<S::Config> {
        &self.config
    }

    fn reset_inner(&mut self, episode: &mut Episode) -> Result<CameraObs, DriveEnvError> {
        self.sim.apply_control(episode.vehicle, &ControlCommand::idle())?;

        let camera_bp = self
            .sim
            .blueprint("sensor.camera.rgb")?
            .with_attribute("image_size_x", self.config.image_width)
            .with_attribute("image_size_y", self.config.image_height)
            .with_attribute("fov", self.config.fov);
        let camera =
            self.sim
                .spawn_sensor(&camera_bp, &self.config.camera_mount, episode.vehicle)?;
        episode.actors.push(camera);
        let frames = self.frames.clone();
        self.sim.listen(
            camera,
            Box::new(move |data| {
                if let SensorData::Image(image) = data {
                    match CameraObs::from_bgra(&image) {
                        Ok(obs) => frames.write(obs),
                        Err(e) => warn!("Dropped undecodable frame {}: {}", image.frame, e),
                    }
                }
            }),
        )?;

        let collision_bp = self.sim.blueprint("sensor.other.collision")?;
        let collision = self.sim.spawn_sensor(
            &collision_bp,
            &Mount::rigid(0.0, 0.0, 0.0),
            episode.vehicle,
        )?;
        episode.actors.push(collision);
        let sink = self.collisions.sink();
        self.sim.listen(
            collision,
            Box::new(move |data| {
                if let SensorData::Collision(event) = data {
                    sink.record(event);
                }
            }),
        )?;

        let timeout = self.first_frame_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            self.sim.tick()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let wait = remaining.min(self.step_frame_timeout);
            if let Some(obs) = self.frames.read(wait) {
                return Ok((*obs).clone());
            }
            if Instant::now() >= deadline {
                return Err(DriveEnvError::SetupTimeout(timeout));
            }
        }
    }

    fn spawn_vehicle(&mut self, bp: &Blueprint) -> Result<ActorId, DriveEnvError> {
        let mut points = self.sim.spawn_points();
        if points.is_empty() {
            return Err(DriveEnvError::NoSpawnPoints);
        }
        self.rng.shuffle(&mut points);

        let attempts = self.config.max_spawn_attempts.max(1).min(points.len());
        for at in points.iter().take(attempts) {
            match self.sim.spawn_vehicle(bp, at) {
                Ok(vehicle) => {
                    debug!("Spawned vehicle {} at ({}, {})", vehicle, at.x, at.y);
                    return Ok(vehicle);
                }
                Err(SimError::SpawnCollision { x, y }) => {
                    debug!("Spawn point ({}, {}) is occupied", x, y);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(DriveEnvError::NoFreeSpawnPoint(attempts))
    }

    fn teardown(&mut self) {
        let episode = match self.episode.take() {
            Some(episode) => episode,
            None => return,
        };
        for actor in episode.actors.iter().rev() {
            match self.sim.destroy(*actor) {
                Ok(()) => trace!("Destroyed actor {}", actor),
                Err(e) => warn!("Failed to destroy actor {}: {}", actor, e),
            }
        }
    }

    fn reward(&self, speed_kmh: f32) -> (f32, Option<Termination>) {
        let reward = &self.config.reward;
        if self.collisions.has_collided() {
            (reward.collision_penalty, Some(Termination::Crashed))
        } else if self.stale_steps > self.config.max_stale_steps {
            (0.0, Some(Termination::Disconnected))
        } else if self.config.time_limit
            && self.episode_start.elapsed().as_secs_f32() > self.config.seconds_per_episode
        {
            (reward.timeout_reward, Some(Termination::TimedOut))
        } else if speed_kmh < reward.min_speed_kmh {
            (reward.slow_penalty, None)
        } else {
            (reward.cruise_reward, None)
        }
    }
}

impl<S: Simulator> Env for DriveEnv<S> {
    type Config = DriveEnvConfig<S::Config>;
    type Obs = CameraObs;
    type Act = DriveAct;
    type Info = DriveInfo;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let first_frame_timeout =
            checked_timeout("first_frame_timeout_secs", config.first_frame_timeout_secs)?;
        let step_frame_timeout =
            checked_timeout("step_frame_timeout_secs", config.step_frame_timeout_secs)?;
        let sim = S::connect(&config.sim)?;
        info!("Connected to the simulator");
        Ok(Self {
            config: config.clone(),
            sim,
            rng: fastrand::Rng::with_seed(seed as u64),
            mapper: config.action_mapper,
            frames: Arc::new(SensorFrameBuffer::new()),
            collisions: Arc::new(CollisionMonitor::new()),
            episode: None,
            last_obs: None,
            stale_steps: 0,
            episode_start: Instant::now(),
            first_frame_timeout,
            step_frame_timeout,
        })
    }

    fn reset(&mut self) -> Result<CameraObs> {
        self.teardown();
        self.collisions.begin_episode();
        self.frames.clear();
        self.last_obs = None;
        self.stale_steps = 0;

        let vehicle_bp = self.sim.blueprint(&self.config.vehicle_blueprint)?;
        let vehicle = self.spawn_vehicle(&vehicle_bp)?;
        let mut episode = Episode {
            vehicle,
            actors: vec![vehicle],
        };

        let result = self.reset_inner(&mut episode);
        self.episode = Some(episode);
        let obs = match result {
            Ok(obs) => obs,
            Err(e) => {
                self.teardown();
                return Err(e.into());
            }
        };

        // Setting up the sensors may have bumped into something.
        self.collisions.clear();
        self.episode_start = Instant::now();
        self.last_obs = Some(obs.clone());
        debug!("Episode started at frame {}", obs.frame());
        Ok(obs)
    }

    fn step(&mut self, act: &DriveAct) -> Result<(Step<Self>, Record)> {
        let vehicle = match &self.episode {
            Some(episode) => episode.vehicle,
            None => return Err(DriveEnvError::NoEpisode.into()),
        };

        let control = self.mapper.map(act);
        self.sim.apply_control(vehicle, &control)?;
        self.sim.tick()?;

        let timeout = self.step_frame_timeout;
        let obs = match self.frames.read(timeout) {
            Some(obs) => {
                self.stale_steps = 0;
                let obs = (*obs).clone();
                self.last_obs = Some(obs.clone());
                obs
            }
            None => {
                self.stale_steps += 1;
                warn!(
                    "No camera frame within {:?}, reusing the last one ({} stale steps)",
                    timeout, self.stale_steps
                );
                match &self.last_obs {
                    Some(obs) => obs.clone(),
                    None => return Err(DriveEnvError::NoEpisode.into()),
                }
            }
        };

        let speed = speed_kmh(self.sim.velocity(vehicle)?);
        let (reward, termination) = self.reward(speed);
        if let Some(t) = termination {
            debug!("Episode {} at frame {}", t, obs.frame());
            self.teardown();
        }

        let info = DriveInfo {
            frame: obs.frame(),
            speed_kmh: speed,
            stale_steps: self.stale_steps,
            dropped_frames: self.frames.dropped(),
        };
        let record = Record::from_scalar("speed_kmh", speed);
        let step = Step::new(obs, *act, reward, termination, info);
        Ok((step, record))
    }

    fn close(&mut self) {
        self.teardown();
    }
}

/// Converts a timeout of the configuration.
///
/// The value must be a non-negative number of seconds whose deadline, counted
/// from now, is representable.
fn checked_timeout(name: &'static str, secs: f32) -> Result<Duration, DriveEnvError> {
    Duration::try_from_secs_f32(secs)
        .ok()
        .filter(|d| Instant::now().checked_add(*d).is_some())
        .ok_or(DriveEnvError::InvalidTimeout { name, secs })
}

impl<S: Simulator> Drop for DriveEnv<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
