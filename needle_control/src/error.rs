//! Controller error types.
//!
//! Rejections are ordinary values the supervisory loop logs and moves past.
//! `ControllerError` only appears while building the controller and is fatal.

use needle_common::config::ConfigError;
use needle_common::steering::config::ActuatorId;
use needle_common::steering::direction::Direction;
use thiserror::Error;

use crate::geometry::GeometryError;
use crate::hal::HalError;

/// Why a command produced no motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// Command carried no resolvable direction.
    #[error("no direction")]
    NoDirection,

    /// Neither the push nor the pull set can absorb the move within travel.
    #[error("{direction} by ({dx}, {dy}) is out of range")]
    OutOfRange { direction: Direction, dx: i32, dy: i32 },
}

/// A single-actuator run that would leave `[0, max_steps]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TravelError {
    #[error("actuator {id}: {count} + {steps} exceeds max {max}")]
    Overrun {
        id: ActuatorId,
        count: u32,
        steps: u32,
        max: u32,
    },

    #[error("actuator {id}: {count} - {steps} falls below 0")]
    Underrun {
        id: ActuatorId,
        count: u32,
        steps: u32,
    },
}

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("hardware: {0}")]
    Hal(#[from] HalError),
}
