//! Discrete driving actions.
use crate::sim::ControlCommand;
use roadtest_core::Act;
use serde::{Deserialize, Serialize};

/// A driving action: 0 = left, 1 = straight, 2 = right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveAct(usize);

impl DriveAct {
    /// Steer to the left.
    pub const LEFT: Self = Self(0);

    /// Keep straight.
    pub const STRAIGHT: Self = Self(1);

    /// Steer to the right.
    pub const RIGHT: Self = Self(2);
}

impl Act for DriveAct {
    const N_ACTIONS: usize = 3;

    fn from_index(ix: usize) -> Self {
        assert!(
            ix < Self::N_ACTIONS,
            "action index {} out of range 0..{}",
            ix,
            Self::N_ACTIONS
        );
        Self(ix)
    }

    fn index(&self) -> usize {
        self.0
    }
}

/// Maps a [`DriveAct`] to a [`ControlCommand`].
///
/// Every action drives with full throttle; the left and right actions steer
/// by `steer_amount`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionMapper {
    /// Throttle of every action.
    pub throttle: f32,

    /// Magnitude of steering of the left and right actions.
    pub steer_amount: f32,
}

impl Default for ActionMapper {
    fn default() -> Self {
        Self {
            throttle: 1.0,
            steer_amount: 1.0,
        }
    }
}

impl ActionMapper {
    /// Returns the control of an action.
    pub fn map(&self, act: &DriveAct) -> ControlCommand {
        let steer = match act.index() {
            0 => -self.steer_amount,
            1 => 0.0,
            2 => self.steer_amount,
            ix => unreachable!("invalid action index {}", ix),
        };
        ControlCommand {
            throttle: self.throttle,
            steer,
            brake: 0.0,
        }
    }
}
