//! State and kinematics of the sandbox world.
use super::{render, SandboxConfig};
use crate::{
    error::SimError,
    sim::{ActorId, CollisionEvent, ControlCommand, Mount, SensorCallback, SensorData, Transform},
};
use log::trace;
use std::collections::BTreeMap;

/// Minimum distance between spawned vehicles.
const VEHICLE_LENGTH: f32 = 4.5;

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Vehicle {
    pub x: f32,
    pub y: f32,
    pub yaw: f32,

    /// m/s.
    pub speed: f32,
    pub control: ControlCommand,
    pub in_contact: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Camera {
    pub parent: ActorId,
    pub width: u32,
    pub height: u32,
    pub fov: f32,
    pub mount: Mount,
}

pub(super) enum ActorKind {
    Vehicle(Vehicle),
    Camera(Camera),
    CollisionSensor { parent: ActorId },
}

struct Actor {
    kind: ActorKind,
    callback: Option<SensorCallback>,
}

pub(super) struct World {
    config: SandboxConfig,
    frame: u64,
    next_id: ActorId,
    actors: BTreeMap<ActorId, Actor>,
    camera_blackout: bool,
}

impl World {
    pub fn new(config: SandboxConfig) -> Self {
        let camera_blackout = config.camera_blackout;
        Self {
            config,
            frame: 0,
            next_id: 1,
            actors: BTreeMap::new(),
            camera_blackout,
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn live_actors(&self) -> usize {
        self.actors.len()
    }

    pub fn set_camera_blackout(&mut self, v: bool) {
        self.camera_blackout = v;
    }

    fn insert(&mut self, kind: ActorKind) -> ActorId {
        let id = self.next_id;
        self.next_id += 1;
        self.actors.insert(
            id,
            Actor {
                kind,
                callback: None,
            },
        );
        id
    }

    fn vehicle(&self, id: ActorId) -> Result<&Vehicle, SimError> {
        match self.actors.get(&id).map(|a| &a.kind) {
            Some(ActorKind::Vehicle(v)) => Ok(v),
            Some(_) => Err(SimError::Unsupported(id, "vehicle control")),
            None => Err(SimError::NoSuchActor(id)),
        }
    }

    pub fn spawn_vehicle(&mut self, at: &Transform) -> Result<ActorId, SimError> {
        let near = |x: f32, y: f32| (x - at.x).hypot(y - at.y) < VEHICLE_LENGTH;
        let parked = self
            .config
            .occupied_spawn_points
            .iter()
            .filter_map(|&i| self.config.spawn_points.get(i))
            .any(|p| near(p.x, p.y));
        let driving = self.actors.values().any(|a| match &a.kind {
            ActorKind::Vehicle(v) => near(v.x, v.y),
            _ => false,
        });
        if parked || driving {
            return Err(SimError::SpawnCollision { x: at.x, y: at.y });
        }

        Ok(self.insert(ActorKind::Vehicle(Vehicle {
            x: at.x,
            y: at.y,
            yaw: at.yaw,
            ..Vehicle::default()
        })))
    }

    pub fn spawn_sensor(&mut self, kind: ActorKind) -> Result<ActorId, SimError> {
        let parent = match &kind {
            ActorKind::Camera(c) => c.parent,
            ActorKind::CollisionSensor { parent } => *parent,
            ActorKind::Vehicle(_) => unreachable!("vehicles are spawned by spawn_vehicle()"),
        };
        self.vehicle(parent)?;
        Ok(self.insert(kind))
    }

    pub fn listen(&mut self, sensor: ActorId, callback: SensorCallback) -> Result<(), SimError> {
        match self.actors.get_mut(&sensor) {
            Some(Actor {
                kind: ActorKind::Vehicle(_),
                ..
            }) => Err(SimError::Unsupported(sensor, "listen")),
            Some(actor) => {
                actor.callback = Some(callback);
                Ok(())
            }
            None => Err(SimError::NoSuchActor(sensor)),
        }
    }

    pub fn apply_control(
        &mut self,
        vehicle: ActorId,
        control: &ControlCommand,
    ) -> Result<(), SimError> {
        match self.actors.get_mut(&vehicle).map(|a| &mut a.kind) {
            Some(ActorKind::Vehicle(v)) => {
                v.control = *control;
                Ok(())
            }
            Some(_) => Err(SimError::Unsupported(vehicle, "vehicle control")),
            None => Err(SimError::NoSuchActor(vehicle)),
        }
    }

    pub fn velocity(&self, vehicle: ActorId) -> Result<[f32; 3], SimError> {
        let v = self.vehicle(vehicle)?;
        Ok([v.speed * v.yaw.cos(), v.speed * v.yaw.sin(), 0.0])
    }

    pub fn destroy(&mut self, actor: ActorId) -> Result<(), SimError> {
        match self.actors.remove(&actor) {
            Some(_) => Ok(()),
            None => Err(SimError::NoSuchActor(actor)),
        }
    }

    /// Advances the world by one step and delivers sensor data.
    pub fn advance(&mut self) {
        self.frame += 1;
        let dt = self.config.delta_seconds;
        let max_speed = self.config.max_speed_kmh / 3.6;

        for actor in self.actors.values_mut() {
            if let ActorKind::Vehicle(v) = &mut actor.kind {
                let c = v.control;
                let accel = c.throttle.clamp(0.0, 1.0) * self.config.acceleration
                    - c.brake.clamp(0.0, 1.0) * self.config.braking;
                v.speed = (v.speed + accel * dt).clamp(0.0, max_speed);
                if v.speed > 0.0 {
                    v.yaw += c.steer.clamp(-1.0, 1.0) * self.config.steer_rate * dt;
                }
                v.x += v.speed * v.yaw.cos() * dt;
                v.y += v.speed * v.yaw.sin() * dt;
                v.in_contact = contact(&self.config, v);
            }
        }

        let mut deliveries = vec![];
        for (id, actor) in self.actors.iter() {
            if actor.callback.is_none() {
                continue;
            }
            match &actor.kind {
                ActorKind::Camera(camera) if !self.camera_blackout => {
                    let parent = self.actors.get(&camera.parent).map(|a| &a.kind);
                    if let Some(ActorKind::Vehicle(v)) = parent {
                        let image = render::render(&self.config, v, camera, self.frame);
                        deliveries.push((*id, SensorData::Image(image)));
                    }
                }
                ActorKind::CollisionSensor { parent } => {
                    let parent = self.actors.get(parent).map(|a| &a.kind);
                    if let Some(ActorKind::Vehicle(v)) = parent {
                        if let Some(other) = v.in_contact {
                            deliveries.push((
                                *id,
                                SensorData::Collision(CollisionEvent {
                                    frame: self.frame,
                                    other_actor: Some(other.to_string()),
                                }),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        for (id, data) in deliveries {
            if let Some(callback) = self.actors.get_mut(&id).and_then(|a| a.callback.as_mut()) {
                trace!("Delivering frame {} to sensor {}", self.frame, id);
                callback(data);
            }
        }
    }
}

/// Returns the type of what the vehicle touches, if anything.
fn contact(config: &SandboxConfig, v: &Vehicle) -> Option<&'static str> {
    if v.y.abs() > config.road_half_width {
        return Some("static.sidewalk");
    }
    let hit = config
        .obstacles
        .iter()
        .any(|o| (o.x - v.x).hypot(o.y - v.y) < config.obstacle_radius);
    if hit {
        Some("static.prop")
    } else {
        None
    }
}
