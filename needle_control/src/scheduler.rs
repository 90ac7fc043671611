//! Synchronized two-lane step scheduling.
//!
//! Two actuators of a set usually need different step counts. Issuing all of
//! one lane and then all of the other would bend the needle along an L; the
//! interleave below spreads the smaller lane across the bigger one so both
//! finish together.
//!
//! With `big ≥ small > 0` and `ratio = big / small`, slot `i` belongs to the
//! small lane when `i % (ratio + 1) == 0 && i != 0` and to the big lane
//! otherwise. A lane that has issued all its steps hands its slots to the
//! other, so each lane gets exactly its count. A zero-count lane gets none.
//!
//! The pulse train blocks its thread until done.

use tracing::trace;

use crate::actuator::{Actuator, PulseTimer, Role};

/// Which of the two driven actuators a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    A,
    B,
}

impl Lane {
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Slot order for a pair of step counts.
#[derive(Debug, Clone)]
pub struct Interleave {
    remaining: [u32; 2],
    big: Lane,
    /// `ratio + 1`, or 0 when one lane is empty.
    period: u64,
    slot: u64,
}

impl Interleave {
    pub fn new(steps_a: u32, steps_b: u32) -> Self {
        let big = if steps_a >= steps_b { Lane::A } else { Lane::B };
        let (hi, lo) = (steps_a.max(steps_b), steps_a.min(steps_b));
        let period = if lo == 0 { 0 } else { u64::from(hi / lo) + 1 };
        Self {
            remaining: [steps_a, steps_b],
            big,
            period,
            slot: 0,
        }
    }

    #[inline]
    fn remaining(&self, lane: Lane) -> u32 {
        self.remaining[lane as usize]
    }

    fn preferred(&self) -> Lane {
        if self.period != 0 && self.slot != 0 && self.slot % self.period == 0 {
            self.big.other()
        } else {
            self.big
        }
    }
}

impl Iterator for Interleave {
    type Item = Lane;

    fn next(&mut self) -> Option<Lane> {
        let preferred = self.preferred();
        let lane = if self.remaining(preferred) > 0 {
            preferred
        } else if self.remaining(preferred.other()) > 0 {
            preferred.other()
        } else {
            return None;
        };
        self.remaining[lane as usize] -= 1;
        self.slot += 1;
        Some(lane)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = u64::from(self.remaining[0]) + u64::from(self.remaining[1]);
        match usize::try_from(n) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl ExactSizeIterator for Interleave {}

/// Drive two actuators in `role`, interleaved. Returns pulses issued.
///
/// Both direction lines are set once, before the first pulse. Slots then
/// follow [`Interleave`]: `steps_a` pulses on `a` and `steps_b` on `b`,
/// whatever the ratio between them, and a zero count leaves that actuator's
/// pulse line untouched. Every pulse holds the line high and then low for
/// one timer width, so the call blocks for
/// `(steps_a + steps_b) × 2 × width`.
///
/// Travel limits and counters are not touched. The caller checks the plan
/// against the limits beforehand and adjusts the counters once the train is
/// done, so a train is never cut short halfway.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use needle_control::actuator::{Actuator, PulseTimer, Role};
/// use needle_control::hal::Board;
/// use needle_control::hal::simulation::{SimulatedBoard, SimulatedDelay};
/// use needle_control::scheduler::drive;
///
/// let mut board = SimulatedBoard::new();
/// let mut a = Actuator::new(0, 0, 400, board.output(7)?, board.output(6)?);
/// let mut b = Actuator::new(1, 0, 400, board.output(5)?, board.output(4)?);
/// let mut timer = PulseTimer::new(Duration::from_millis(10), Box::new(SimulatedDelay::new()));
///
/// assert_eq!(drive(&mut a, 6, &mut b, 2, Role::Push, &mut timer), 8);
/// assert_eq!((board.pulses(6), board.pulses(4)), (6, 2));
/// # Ok::<(), needle_control::hal::HalError>(())
/// ```
pub fn drive(
    a: &mut Actuator,
    steps_a: u32,
    b: &mut Actuator,
    steps_b: u32,
    role: Role,
    timer: &mut PulseTimer,
) -> u64 {
    a.set_direction(role);
    b.set_direction(role);

    let mut issued = 0u64;
    for lane in Interleave::new(steps_a, steps_b) {
        match lane {
            Lane::A => a.step(timer),
            Lane::B => b.step(timer),
        }
        issued += 1;
    }
    trace!(
        a = a.id(),
        b = b.id(),
        steps_a,
        steps_b,
        issued,
        "interleaved train done"
    );
    issued
}

/// Drive a single actuator in `role`. Returns pulses issued.
pub fn drive_single(
    actuator: &mut Actuator,
    steps: u32,
    role: Role,
    timer: &mut PulseTimer,
) -> u64 {
    actuator.set_direction(role);
    for _ in 0..steps {
        actuator.step(timer);
    }
    u64::from(steps)
}
