//! Boundary to a driving simulator.
//!
//! [`Simulator`] is the minimal surface the environment adapter needs from a
//! simulator: spawning and destroying actors, attaching sensors which deliver
//! data through callbacks, applying vehicle controls and advancing the world.
use crate::error::SimError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Debug};

/// Identifier of an actor in the simulated world.
pub type ActorId = u64;

/// Callback receiving the data of a sensor.
///
/// The callback may be invoked from a thread owned by the simulator.
pub type SensorCallback = Box<dyn FnMut(SensorData) + Send + 'static>;

/// Position and heading, in meters and radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Forward.
    pub x: f32,

    /// Right.
    pub y: f32,

    /// Up.
    pub z: f32,

    /// Heading around the z-axis.
    pub yaw: f32,
}

impl Transform {
    /// A transform at the given location, heading along the x-axis.
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, yaw: 0.0 }
    }
}

/// How a sensor follows its parent actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attachment {
    /// Fixed to the parent.
    Rigid,

    /// Follows the parent with some lag.
    SpringArm,
}

/// Placement of a sensor relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mount {
    /// Offset from the parent.
    pub transform: Transform,

    /// Attachment type.
    pub attachment: Attachment,
}

impl Mount {
    /// A rigid mount at the given offset.
    pub fn rigid(x: f32, y: f32, z: f32) -> Self {
        Self {
            transform: Transform::at(x, y, z),
            attachment: Attachment::Rigid,
        }
    }
}

/// Template of an actor, with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    id: String,
    attributes: BTreeMap<String, String>,
}

impl Blueprint {
    /// Constructs a blueprint without attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Returns the identifier, like `vehicle.tesla.model3`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(key.into(), value.to_string());
        self
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Vehicle control.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlCommand {
    /// In `[0, 1]`.
    pub throttle: f32,

    /// In `[-1, 1]`, negative to the left.
    pub steer: f32,

    /// In `[0, 1]`.
    pub brake: f32,
}

impl ControlCommand {
    /// No throttle, no steering, no brake.
    pub fn idle() -> Self {
        Self::default()
    }
}

/// A camera image in BGRA byte order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    /// Simulator frame the image was rendered at.
    pub frame: u64,

    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// `height * width * 4` bytes.
    pub bgra: Vec<u8>,
}

/// A collision of the parent of a collision sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    /// Simulator frame of the collision.
    pub frame: u64,

    /// Type of the other party, if known.
    pub other_actor: Option<String>,
}

/// Data delivered by a sensor.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorData {
    /// From a camera.
    Image(RawImage),

    /// From a collision sensor.
    Collision(CollisionEvent),
}

/// A driving simulator.
///
/// After [`Simulator::destroy`] returned for a sensor, the callback registered
/// on it must never be invoked again.
pub trait Simulator {
    /// Connection parameters.
    type Config: Clone + Debug + Serialize + DeserializeOwned;

    /// Connects to the simulator.
    fn connect(config: &Self::Config) -> Result<Self, SimError>
    where
        Self: Sized;

    /// Returns the recommended spawn points of the map.
    fn spawn_points(&self) -> Vec<Transform>;

    /// Finds a blueprint by its identifier.
    fn blueprint(&self, id: &str) -> Result<Blueprint, SimError>;

    /// Spawns a vehicle.
    ///
    /// Fails with [`SimError::SpawnCollision`] if the location is occupied.
    fn spawn_vehicle(&mut self, bp: &Blueprint, at: &Transform) -> Result<ActorId, SimError>;

    /// Spawns a sensor attached to `parent`.
    fn spawn_sensor(
        &mut self,
        bp: &Blueprint,
        mount: &Mount,
        parent: ActorId,
    ) -> Result<ActorId, SimError>;

    /// Registers the callback of a sensor, replacing a previous one.
    fn listen(&mut self, sensor: ActorId, callback: SensorCallback) -> Result<(), SimError>;

    /// Applies a control to a vehicle.
    fn apply_control(&mut self, vehicle: ActorId, control: &ControlCommand)
        -> Result<(), SimError>;

    /// Returns the velocity of a vehicle in m/s.
    fn velocity(&self, vehicle: ActorId) -> Result<[f32; 3], SimError>;

    /// Advances the world if the simulator runs in synchronous mode, and
    /// returns the current frame.
    fn tick(&mut self) -> Result<u64, SimError>;

    /// Destroys an actor.
    fn destroy(&mut self, actor: ActorId) -> Result<(), SimError>;
}

/// Converts a velocity in m/s to a speed in km/h.
pub fn speed_kmh(v: [f32; 3]) -> f32 {
    3.6 * (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
