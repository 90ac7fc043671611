//! Hardware boundary.
//!
//! The controller never touches a board SDK directly. It talks to:
//!
//! | Trait           | Role                                         |
//! |-----------------|----------------------------------------------|
//! | `DigitalOutput` | one direction or pulse line of a driver      |
//! | `Delay`         | fixed-duration blocking wait for pulse timing |
//! | `Board`         | hands out exclusive output lines by pin      |
//! | `LinearStage`   | target/speed setpoint registers of the stage |
//!
//! The [`simulation`] backend implements all four for tests and dry runs.

pub mod simulation;

use std::time::Duration;

use thiserror::Error;

/// Errors raised by hardware backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Pin number not present on the board.
    #[error("pin {0} not available on this board")]
    PinUnavailable(u8),

    /// Pin already handed out to another line.
    #[error("pin {0} already claimed")]
    PinClaimed(u8),

    /// Transport to the board or stage failed.
    #[error("hardware communication error: {0}")]
    Communication(String),
}

/// One logical output line.
pub trait DigitalOutput: Send {
    fn write(&mut self, level: bool);
}

/// Blocking wait used between pulse edges.
///
/// Pulse width is a hard timing requirement of the stepper drivers, so the
/// wait is a plain blocking hold, never a cooperative yield.
pub trait Delay: Send {
    fn hold(&mut self, duration: Duration);
}

/// Wall-clock delay backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    #[inline]
    fn hold(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Source of output lines.
pub trait Board: Send {
    /// Backend identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    /// Claim `pin` as an output. Each pin can be claimed once.
    fn output(&mut self, pin: u8) -> Result<Box<dyn DigitalOutput>, HalError>;
}

/// Setpoint interface of the linear insertion stage.
///
/// The stage runs its own position loop; the host only writes targets.
pub trait LinearStage: Send {
    /// Write the target position register [mm].
    fn write_target(&mut self, position: f64) -> Result<(), HalError>;

    /// Write the speed register.
    fn write_speed(&mut self, speed: f64) -> Result<(), HalError>;
}
