//! Homing: bring every tendon back to a known rest length.
//!
//! ## Sequence
//!
//! 1. Stage (if attached) returns to its initial position.
//! 2. Midpoint = `(max + min) / 2` of the current counters.
//! 3. Each actuator runs individually to the midpoint.
//! 4. Each actuator runs individually from the midpoint to the rest target.
//!
//! The rest target is the configured `rest_steps` until an origin is captured
//! with `reset_origin`, which then replaces it.

use needle_common::consts::ACTUATOR_COUNT;
use serde::Serialize;

/// Result of one homing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HomeReport {
    /// Common intermediate count.
    pub midpoint: u32,
    /// Final count of every actuator.
    pub rest: u32,
    /// Counters before homing started.
    pub counts: [u32; ACTUATOR_COUNT],
    /// Stage returned to its initial position.
    pub stage_restored: bool,
}

/// Midpoint between the most and least extended actuator.
pub fn midpoint(counts: &[u32; ACTUATOR_COUNT]) -> u32 {
    let max = counts.iter().copied().max().unwrap_or(0);
    let min = counts.iter().copied().min().unwrap_or(0);
    ((u64::from(max) + u64::from(min)) / 2) as u32
}

/// Rest target: captured origin first, configured rest position otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestTarget {
    configured: u32,
    origin: Option<u32>,
}

impl RestTarget {
    pub const fn new(configured: u32) -> Self {
        Self {
            configured,
            origin: None,
        }
    }

    #[inline]
    pub fn get(&self) -> u32 {
        self.origin.unwrap_or(self.configured)
    }

    #[inline]
    pub fn origin(&self) -> Option<u32> {
        self.origin
    }

    pub fn capture(&mut self, origin: u32) {
        self.origin = Some(origin);
    }

    /// Forget the captured origin. Returns the one dropped, if any.
    pub fn clear(&mut self) -> Option<u32> {
        self.origin.take()
    }
}
