//! Configuration of [`Sandbox`](super::Sandbox).
use crate::sim::Transform;
use serde::{Deserialize, Serialize};

/// How the world of the [`Sandbox`](super::Sandbox) advances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SyncMode {
    /// The world advances by one step in every `tick()`, and sensor data is
    /// delivered from the calling thread.
    Synchronous,

    /// A worker thread advances the world at a fixed rate and delivers sensor
    /// data; `tick()` only reports the current frame.
    Asynchronous {
        /// Steps per second of the worker.
        fps: f32,
    },
}

/// Configuration of [`Sandbox`](super::Sandbox).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Synchronization with the client.
    pub mode: SyncMode,

    /// Simulated time of a step in seconds.
    pub delta_seconds: f32,

    /// Spawn points of the map.
    pub spawn_points: Vec<Transform>,

    /// Static obstacles on the road.
    pub obstacles: Vec<Transform>,

    /// Lateral extent of the road from its center line, which is the x-axis.
    pub road_half_width: f32,

    /// Distance from an obstacle at which a vehicle collides with it.
    pub obstacle_radius: f32,

    /// Acceleration at full throttle in m/s^2.
    pub acceleration: f32,

    /// Deceleration at full brake in m/s^2.
    pub braking: f32,

    /// Yaw rate at full steering in rad/s.
    pub steer_rate: f32,

    /// Top speed in km/h.
    pub max_speed_kmh: f32,

    /// Indices of spawn points blocked by parked vehicles.
    pub occupied_spawn_points: Vec<usize>,

    /// If `true`, cameras never deliver images.
    pub camera_blackout: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::Synchronous,
            delta_seconds: 0.05,
            spawn_points: vec![
                Transform::at(0.0, -1.75, 0.0),
                Transform::at(30.0, 1.75, 0.0),
                Transform::at(60.0, -1.75, 0.0),
                Transform::at(90.0, 1.75, 0.0),
            ],
            obstacles: vec![],
            road_half_width: 7.0,
            obstacle_radius: 2.0,
            acceleration: 6.0,
            braking: 10.0,
            steer_rate: 0.8,
            max_speed_kmh: 120.0,
            occupied_spawn_points: vec![],
            camera_blackout: false,
        }
    }
}

impl SandboxConfig {
    /// Sets the synchronization mode.
    pub fn mode(mut self, v: SyncMode) -> Self {
        self.mode = v;
        self
    }

    /// Sets the simulated time of a step.
    pub fn delta_seconds(mut self, v: f32) -> Self {
        self.delta_seconds = v;
        self
    }

    /// Sets the spawn points.
    pub fn spawn_points(mut self, v: Vec<Transform>) -> Self {
        self.spawn_points = v;
        self
    }

    /// Sets the obstacles.
    pub fn obstacles(mut self, v: Vec<Transform>) -> Self {
        self.obstacles = v;
        self
    }

    /// Sets the half width of the road.
    pub fn road_half_width(mut self, v: f32) -> Self {
        self.road_half_width = v;
        self
    }

    /// Blocks spawn points.
    pub fn occupied_spawn_points(mut self, v: Vec<usize>) -> Self {
        self.occupied_spawn_points = v;
        self
    }

    /// Turns off every camera.
    pub fn camera_blackout(mut self, v: bool) -> Self {
        self.camera_blackout = v;
        self
    }
}
