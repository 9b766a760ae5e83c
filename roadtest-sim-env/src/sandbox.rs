//! An in-process driving simulator.
mod config;
mod render;
mod world;
use crate::{
    error::SimError,
    sim::{ActorId, Blueprint, ControlCommand, Mount, SensorCallback, Simulator, Transform},
};
pub use config::{SandboxConfig, SyncMode};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};
use world::{ActorKind, Camera, World};

const VEHICLES: [&str; 3] = [
    "vehicle.tesla.model3",
    "vehicle.audi.tt",
    "vehicle.lincoln.mkz2017",
];
const CAMERA: &str = "sensor.camera.rgb";
const COLLISION: &str = "sensor.other.collision";

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// A kinematic world with a straight road, static obstacles, vehicles, RGB
/// cameras and collision sensors.
///
/// The world sits behind a mutex which is held while sensor callbacks run, so
/// no callback of a sensor is invoked after [`Simulator::destroy`] returned
/// for it. Callbacks must not call back into the simulator.
pub struct Sandbox {
    world: Arc<Mutex<World>>,
    worker: Option<Worker>,
}

impl Sandbox {
    fn world(&self) -> Result<MutexGuard<'_, World>, SimError> {
        self.world
            .lock()
            .map_err(|_| SimError::Disconnected("a sensor callback panicked".to_string()))
    }

    fn world_unchecked(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live actors.
    pub fn live_actors(&self) -> usize {
        self.world_unchecked().live_actors()
    }

    /// Current frame of the world.
    pub fn frame(&self) -> u64 {
        self.world_unchecked().frame()
    }

    /// Turns every camera off or on.
    pub fn set_camera_blackout(&self, v: bool) {
        self.world_unchecked().set_camera_blackout(v);
    }
}

fn attribute<T: std::str::FromStr>(bp: &Blueprint, key: &str) -> Result<T, SimError> {
    let value = bp.attribute(key).unwrap_or_default();
    value.parse().map_err(|_| SimError::InvalidAttribute {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl Simulator for Sandbox {
    type Config = SandboxConfig;

    fn connect(config: &Self::Config) -> Result<Self, SimError> {
        if !(config.delta_seconds > 0.0) {
            return Err(SimError::Connection(format!(
                "delta_seconds must be positive, got {}",
                config.delta_seconds
            )));
        }
        let world = Arc::new(Mutex::new(World::new(config.clone())));

        let worker = match config.mode {
            SyncMode::Synchronous => None,
            SyncMode::Asynchronous { fps } => {
                if !(fps > 0.0) {
                    return Err(SimError::Connection(format!(
                        "fps must be positive, got {}",
                        fps
                    )));
                }
                let period = Duration::from_secs_f32(1.0 / fps);
                let (stop, stopped) = bounded::<()>(1);
                let world = world.clone();
                let handle = thread::Builder::new()
                    .name("sandbox-world".to_string())
                    .spawn(move || loop {
                        match stopped.recv_timeout(period) {
                            Err(RecvTimeoutError::Timeout) => match world.lock() {
                                Ok(mut world) => world.advance(),
                                Err(_) => break,
                            },
                            _ => break,
                        }
                    })
                    .map_err(|e| SimError::Connection(e.to_string()))?;
                Some(Worker { stop, handle })
            }
        };

        info!("Sandbox started in {:?} mode", config.mode);
        Ok(Self { world, worker })
    }

    fn spawn_points(&self) -> Vec<Transform> {
        self.world_unchecked().config().spawn_points.clone()
    }

    fn blueprint(&self, id: &str) -> Result<Blueprint, SimError> {
        match id {
            CAMERA => Ok(Blueprint::new(id)
                .with_attribute("image_size_x", 800)
                .with_attribute("image_size_y", 600)
                .with_attribute("fov", 90)),
            COLLISION => Ok(Blueprint::new(id)),
            _ if VEHICLES.contains(&id) => Ok(Blueprint::new(id)),
            _ => Err(SimError::UnknownBlueprint(id.to_string())),
        }
    }

    fn spawn_vehicle(&mut self, bp: &Blueprint, at: &Transform) -> Result<ActorId, SimError> {
        if !VEHICLES.contains(&bp.id()) {
            return Err(SimError::UnknownBlueprint(bp.id().to_string()));
        }
        let id = self.world()?.spawn_vehicle(at)?;
        debug!("Spawned {} as actor {}", bp.id(), id);
        Ok(id)
    }

    fn spawn_sensor(
        &mut self,
        bp: &Blueprint,
        mount: &Mount,
        parent: ActorId,
    ) -> Result<ActorId, SimError> {
        let kind = match bp.id() {
            CAMERA => ActorKind::Camera(Camera {
                parent,
                width: attribute(bp, "image_size_x")?,
                height: attribute(bp, "image_size_y")?,
                fov: attribute(bp, "fov")?,
                mount: *mount,
            }),
            COLLISION => ActorKind::CollisionSensor { parent },
            id => return Err(SimError::UnknownBlueprint(id.to_string())),
        };
        let id = self.world()?.spawn_sensor(kind)?;
        debug!("Spawned {} as actor {} on {}", bp.id(), id, parent);
        Ok(id)
    }

    fn listen(&mut self, sensor: ActorId, callback: SensorCallback) -> Result<(), SimError> {
        self.world()?.listen(sensor, callback)
    }

    fn apply_control(
        &mut self,
        vehicle: ActorId,
        control: &ControlCommand,
    ) -> Result<(), SimError> {
        self.world()?.apply_control(vehicle, control)
    }

    fn velocity(&self, vehicle: ActorId) -> Result<[f32; 3], SimError> {
        self.world()?.velocity(vehicle)
    }

    fn tick(&mut self) -> Result<u64, SimError> {
        let synchronous = self.worker.is_none();
        let mut world = self.world()?;
        if synchronous {
            world.advance();
        }
        Ok(world.frame())
    }

    fn destroy(&mut self, actor: ActorId) -> Result<(), SimError> {
        self.world()?.destroy(actor)?;
        debug!("Destroyed actor {}", actor);
        Ok(())
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            drop(worker.stop);
            if worker.handle.join().is_err() {
                warn!("The sandbox worker panicked");
            }
        }
    }
}
