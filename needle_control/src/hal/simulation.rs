//! Simulated hardware backend.
//!
//! - `SimulatedBoard` owns a pin bank shared with every line it hands out, so
//!   tests keep a handle and read back levels and pulse counts.
//! - `SimulatedDelay` accumulates requested hold time instead of sleeping.
//! - `SimulatedStage` records every register write.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{Board, Delay, DigitalOutput, HalError, LinearStage};

/// Highest pin number exposed by the simulated header.
pub const SIM_PIN_COUNT: usize = 40;

#[derive(Debug, Clone, Copy, Default)]
struct PinState {
    claimed: bool,
    level: bool,
    /// Low→high transitions since the pin was claimed.
    rising_edges: u64,
}

#[derive(Debug)]
struct PinBank {
    pins: [PinState; SIM_PIN_COUNT],
}

impl PinBank {
    fn new() -> Self {
        Self {
            pins: [PinState::default(); SIM_PIN_COUNT],
        }
    }
}

/// Board whose pins live in memory.
///
/// Cloning yields another handle onto the same pin bank.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    bank: Arc<Mutex<PinBank>>,
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self {
            bank: Arc::new(Mutex::new(PinBank::new())),
        }
    }

    /// Current output level of `pin` (`false` for unknown pins).
    pub fn level(&self, pin: u8) -> bool {
        self.bank
            .lock()
            .pins
            .get(usize::from(pin))
            .is_some_and(|p| p.level)
    }

    /// Rising edges seen on `pin`, i.e. step pulses issued.
    pub fn pulses(&self, pin: u8) -> u64 {
        self.bank
            .lock()
            .pins
            .get(usize::from(pin))
            .map_or(0, |p| p.rising_edges)
    }

    /// Sum of rising edges over every claimed pin.
    pub fn total_pulses(&self) -> u64 {
        self.bank
            .lock()
            .pins
            .iter()
            .filter(|p| p.claimed)
            .map(|p| p.rising_edges)
            .sum()
    }
}

impl Board for SimulatedBoard {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn output(&mut self, pin: u8) -> Result<Box<dyn DigitalOutput>, HalError> {
        let mut bank = self.bank.lock();
        let state = bank
            .pins
            .get_mut(usize::from(pin))
            .ok_or(HalError::PinUnavailable(pin))?;
        if state.claimed {
            return Err(HalError::PinClaimed(pin));
        }
        *state = PinState {
            claimed: true,
            ..PinState::default()
        };
        debug!("Simulated pin {pin} claimed as output");
        Ok(Box::new(SimulatedLine {
            pin,
            bank: Arc::clone(&self.bank),
        }))
    }
}

/// Output line handed out by [`SimulatedBoard`].
#[derive(Debug)]
pub struct SimulatedLine {
    pin: u8,
    bank: Arc<Mutex<PinBank>>,
}

impl DigitalOutput for SimulatedLine {
    fn write(&mut self, level: bool) {
        let mut bank = self.bank.lock();
        let state = &mut bank.pins[usize::from(self.pin)];
        if level && !state.level {
            state.rising_edges += 1;
        }
        state.level = level;
        trace!(pin = self.pin, level, "sim write");
    }
}

/// Delay that only accounts for the requested time.
///
/// Cloned handles share the accumulated total.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDelay {
    elapsed: Arc<Mutex<Duration>>,
}

impl SimulatedDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total hold time requested so far.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Delay for SimulatedDelay {
    fn hold(&mut self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }
}

/// Register writes received by a [`SimulatedStage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageWrite {
    Target(f64),
    Speed(f64),
}

#[derive(Debug, Default)]
struct StageRegisters {
    writes: Vec<StageWrite>,
    fault: Option<HalError>,
}

impl StageRegisters {
    fn accept(&mut self, write: StageWrite) -> Result<(), HalError> {
        if let Some(e) = self.fault.take() {
            return Err(e);
        }
        self.writes.push(write);
        Ok(())
    }
}

/// Linear stage that logs register writes.
///
/// [`fail_next`](Self::fail_next) arms a one-shot fault: the next register
/// write is refused with that error and not recorded.
#[derive(Debug, Clone, Default)]
pub struct SimulatedStage {
    registers: Arc<Mutex<StageRegisters>>,
}

impl SimulatedStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<StageWrite> {
        self.registers.lock().writes.clone()
    }

    /// Last target written, if any.
    pub fn target(&self) -> Option<f64> {
        self.registers.lock().writes.iter().rev().find_map(|w| match w {
            StageWrite::Target(t) => Some(*t),
            StageWrite::Speed(_) => None,
        })
    }

    /// Refuse the next register write with `error`.
    pub fn fail_next(&self, error: HalError) {
        self.registers.lock().fault = Some(error);
    }
}

impl LinearStage for SimulatedStage {
    fn write_target(&mut self, position: f64) -> Result<(), HalError> {
        self.registers.lock().accept(StageWrite::Target(position))
    }

    fn write_speed(&mut self, speed: f64) -> Result<(), HalError> {
        self.registers.lock().accept(StageWrite::Speed(speed))
    }
}
