//! Displacement → per-actuator step counts.
//!
//! A pair of basis vectors is solved as a 2×2 linear system whose inverse is
//! computed once at startup. A single basis vector uses the projection
//! `b·v / |v|²`. Step counts are the rounded magnitudes of the coefficients.

use needle_common::steering::config::ActuatorId;
use serde::Serialize;

/// Determinants below this are treated as parallel basis vectors.
pub const DEGENERATE_EPSILON: f64 = 1e-9;

/// Steps planned for one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedSteps {
    pub actuator: ActuatorId,
    pub steps: u32,
}

/// Steps for every member of one actuator set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepPlan {
    entries: heapless::Vec<PlannedSteps, 2>,
}

impl StepPlan {
    #[inline]
    pub fn as_slice(&self) -> &[PlannedSteps] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedSteps> {
        self.entries.iter()
    }

    /// Steps planned for `actuator`, 0 if it is not a member.
    pub fn steps_for(&self, actuator: ActuatorId) -> u32 {
        self.iter()
            .find(|e| e.actuator == actuator)
            .map_or(0, |e| e.steps)
    }

    /// Pulses the plan issues in total.
    pub fn total(&self) -> u32 {
        self.iter().map(|e| e.steps).sum()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.total() == 0
    }
}

impl std::fmt::Display for StepPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "#{}×{}", e.actuator, e.steps)?;
        }
        Ok(())
    }
}

/// Basis vectors are parallel or zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegenerateBasis;

/// Precomputed solver for one actuator set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decomposer {
    Single {
        actuator: ActuatorId,
        /// `v / |v|²`; dotting with `b` gives the coefficient.
        scaled: [f64; 2],
    },
    Pair {
        actuators: [ActuatorId; 2],
        /// Inverse of the column matrix `[v1 v2]`.
        inverse: [[f64; 2]; 2],
    },
}

impl Decomposer {
    pub fn single(actuator: ActuatorId, v: [f64; 2]) -> Result<Self, DegenerateBasis> {
        let norm_sq = v[0] * v[0] + v[1] * v[1];
        if !norm_sq.is_finite() || norm_sq < DEGENERATE_EPSILON {
            return Err(DegenerateBasis);
        }
        Ok(Self::Single {
            actuator,
            scaled: [v[0] / norm_sq, v[1] / norm_sq],
        })
    }

    pub fn pair(
        actuators: [ActuatorId; 2],
        v1: [f64; 2],
        v2: [f64; 2],
    ) -> Result<Self, DegenerateBasis> {
        let det = v1[0] * v2[1] - v2[0] * v1[1];
        if !det.is_finite() || det.abs() < DEGENERATE_EPSILON {
            return Err(DegenerateBasis);
        }
        Ok(Self::Pair {
            actuators,
            inverse: [[v2[1] / det, -v2[0] / det], [-v1[1] / det, v1[0] / det]],
        })
    }

    /// Signed coefficients of `(dx, dy)` along each member's basis vector.
    pub fn coefficients(&self, dx: f64, dy: f64) -> heapless::Vec<(ActuatorId, f64), 2> {
        let mut out = heapless::Vec::new();
        match *self {
            Self::Single { actuator, scaled } => {
                let _ = out.push((actuator, dx * scaled[0] + dy * scaled[1]));
            }
            Self::Pair { actuators, inverse } => {
                let a = inverse[0][0] * dx + inverse[0][1] * dy;
                let c = inverse[1][0] * dx + inverse[1][1] * dy;
                let _ = out.push((actuators[0], a));
                let _ = out.push((actuators[1], c));
            }
        }
        out
    }

    /// Step counts for displacement `(dx, dy)`.
    pub fn plan(&self, dx: i32, dy: i32) -> StepPlan {
        let entries = self
            .coefficients(f64::from(dx), f64::from(dy))
            .into_iter()
            .map(|(actuator, coeff)| PlannedSteps {
                actuator,
                steps: coeff.abs().round() as u32,
            })
            .collect();
        StepPlan { entries }
    }
}
