//! Tendon actuator: one stepper driver with a bounded step counter.
//!
//! The counter is the only record of tendon length. It lives in
//! `0..=max_steps` and changes only through the run/adjust methods here.

use std::time::Duration;

use needle_common::steering::config::ActuatorId;
use serde::Serialize;
use tracing::{trace, warn};

use crate::error::TravelError;
use crate::hal::{Delay, DigitalOutput};

/// Which way a set of actuators moves its tendons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Lengthen the tendon: direction line high, counter increases.
    Push,
    /// Shorten the tendon: direction line low, counter decreases.
    Pull,
}

impl Role {
    #[inline]
    pub const fn direction_level(self) -> bool {
        matches!(self, Self::Push)
    }

    /// Counter delta for `steps` moved in this role.
    #[inline]
    pub const fn signed(self, steps: u32) -> i64 {
        match self {
            Self::Push => steps as i64,
            Self::Pull => -(steps as i64),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Push => "push",
            Self::Pull => "pull",
        })
    }
}

// ─── Pulse Timing ───────────────────────────────────────────────────

/// Fixed-width pulse generator shared by all actuators.
///
/// One pulse is: high, hold `width`, low, hold `width`.
pub struct PulseTimer {
    width: Duration,
    delay: Box<dyn Delay>,
}

impl PulseTimer {
    pub fn new(width: Duration, delay: Box<dyn Delay>) -> Self {
        Self { width, delay }
    }

    #[inline]
    pub fn width(&self) -> Duration {
        self.width
    }

    /// Emit one pulse on `line`.
    #[inline]
    pub fn pulse(&mut self, line: &mut dyn DigitalOutput) {
        line.write(true);
        self.delay.hold(self.width);
        line.write(false);
        self.delay.hold(self.width);
    }
}

impl std::fmt::Debug for PulseTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseTimer")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

// ─── Actuator ───────────────────────────────────────────────────────

pub struct Actuator {
    id: ActuatorId,
    count: u32,
    max_steps: u32,
    direction_line: Box<dyn DigitalOutput>,
    pulse_line: Box<dyn DigitalOutput>,
}

impl std::fmt::Debug for Actuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuator")
            .field("id", &self.id)
            .field("count", &self.count)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}

impl Actuator {
    /// `count` is clamped to `max_steps`.
    pub fn new(
        id: ActuatorId,
        count: u32,
        max_steps: u32,
        direction_line: Box<dyn DigitalOutput>,
        pulse_line: Box<dyn DigitalOutput>,
    ) -> Self {
        Self {
            id,
            count: count.min(max_steps),
            max_steps,
            direction_line,
            pulse_line,
        }
    }

    #[inline]
    pub fn id(&self) -> ActuatorId {
        self.id
    }

    #[inline]
    pub fn get_count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// `true` if `steps` more pushes stay within `max_steps`.
    #[inline]
    pub fn can_push(&self, steps: u32) -> bool {
        u64::from(self.count) + u64::from(steps) <= u64::from(self.max_steps)
    }

    /// `true` if `steps` pulls keep the counter non-negative.
    #[inline]
    pub fn can_pull(&self, steps: u32) -> bool {
        steps <= self.count
    }

    #[inline]
    pub fn can_move(&self, role: Role, steps: u32) -> bool {
        match role {
            Role::Push => self.can_push(steps),
            Role::Pull => self.can_pull(steps),
        }
    }

    pub fn set_direction(&mut self, role: Role) {
        self.direction_line.write(role.direction_level());
    }

    /// One pulse; the counter is not touched.
    pub fn step(&mut self, timer: &mut PulseTimer) {
        timer.pulse(self.pulse_line.as_mut());
        trace!(actuator = self.id, "step");
    }

    /// Push `steps` pulses and increase the counter.
    ///
    /// The direction line is raised before the first pulse and the counter is
    /// updated once the last pulse is done.
    ///
    /// # Errors
    ///
    /// Returns `TravelError::Overrun` if `count + steps` would exceed
    /// `max_steps`. Nothing is pulsed and the counter is unchanged.
    pub fn run_forward(&mut self, steps: u32, timer: &mut PulseTimer) -> Result<(), TravelError> {
        if !self.can_push(steps) {
            let err = TravelError::Overrun {
                id: self.id,
                count: self.count,
                steps,
                max: self.max_steps,
            };
            warn!("Refused forward run: {err}");
            return Err(err);
        }
        self.run(Role::Push, steps, timer);
        Ok(())
    }

    /// Pull `steps` pulses and decrease the counter.
    ///
    /// Refuses, without pulsing, if the counter would go below zero.
    pub fn run_backward(&mut self, steps: u32, timer: &mut PulseTimer) -> Result<(), TravelError> {
        if !self.can_pull(steps) {
            let err = TravelError::Underrun {
                id: self.id,
                count: self.count,
                steps,
            };
            warn!("Refused backward run: {err}");
            return Err(err);
        }
        self.run(Role::Pull, steps, timer);
        Ok(())
    }

    /// Run to an absolute counter value.
    pub fn run_to(&mut self, target: u32, timer: &mut PulseTimer) -> Result<(), TravelError> {
        match target.cmp(&self.count) {
            std::cmp::Ordering::Greater => self.run_forward(target - self.count, timer),
            std::cmp::Ordering::Less => self.run_backward(self.count - target, timer),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }

    /// Apply the net effect of an interleaved run driven from outside.
    ///
    /// The result is clamped into `[0, max_steps]`.
    pub fn adjust_count(&mut self, delta: i64) {
        let next = i64::from(self.count) + delta;
        let clamped = next.clamp(0, i64::from(self.max_steps));
        if clamped != next {
            warn!(
                "Actuator {}: counter adjust {delta} from {} clamped to {clamped}",
                self.id, self.count
            );
        }
        self.count = clamped as u32;
    }

    fn run(&mut self, role: Role, steps: u32, timer: &mut PulseTimer) {
        self.set_direction(role);
        for _ in 0..steps {
            self.step(timer);
        }
        self.adjust_count(role.signed(steps));
    }
}
