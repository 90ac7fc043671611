//! Motion controller: owns the actuators and turns commands into pulse trains.
//!
//! ## Per-command path
//!
//! ```text
//! Idle → GeometryLookup → Decompose → BoundsCheck(push)
//!      → Stepping(push)                              → Idle
//!      → BoundsCheck(pull) → Stepping(pull)          → Idle
//!                          → Rejected                → Idle
//! ```
//!
//! The push set is preferred. When any push member would exceed
//! `max_steps`, the same displacement is decomposed against the pull set;
//! when any pull member would drop below zero the command is rejected and
//! nothing moves. Counters are adjusted only after a pulse train completes.
//!
//! There is no fault state: a rejection is a value and the next command
//! starts from `Idle` again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use needle_common::consts::ACTUATOR_COUNT;
use needle_common::steering::command::MoveCommand;
use needle_common::steering::config::ActuatorId;
use needle_common::steering::direction::Direction;
use tracing::{debug, info, trace, warn};

use crate::actuator::{Actuator, PulseTimer, Role};
use crate::config::LoadedConfig;
use crate::decompose::StepPlan;
use crate::error::{ControllerError, RejectReason};
use crate::geometry::ActuationGeometry;
use crate::homing::{self, HomeReport, RestTarget};
use crate::scheduler::{drive, drive_single};
use crate::session::Session;
use crate::stage::StageSetpoint;

/// Longest per-command path is six phases.
pub const TRAIL_CAPACITY: usize = 8;

// ─── Phases & Outcomes ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionPhase {
    #[default]
    Idle,
    GeometryLookup,
    Decompose,
    BoundsCheck(Role),
    Stepping(Role),
    Rejected,
    Homing,
}

/// What an accepted command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved {
        direction: Direction,
        role: Role,
        steps: StepPlan,
    },
    Homed(HomeReport),
    OriginReset {
        origin: u32,
    },
    /// Captured origin dropped; `rest` is the configured rest position.
    OriginCleared {
        rest: u32,
    },
}

impl std::fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moved {
                direction,
                role,
                steps,
            } => write!(f, "{direction}: {role} [{steps}]"),
            Self::Homed(report) => {
                write!(f, "homed via {} to {}", report.midpoint, report.rest)
            }
            Self::OriginReset { origin } => write!(f, "origin set to {origin}"),
            Self::OriginCleared { rest } => write!(f, "origin cleared, rest at {rest}"),
        }
    }
}

// ─── Controller ─────────────────────────────────────────────────────

pub struct MotionController {
    actuators: heapless::Vec<Actuator, ACTUATOR_COUNT>,
    geometry: ActuationGeometry,
    timer: PulseTimer,
    stage: Option<StageSetpoint>,
    rest: RestTarget,
    phase: MotionPhase,
    trail: heapless::Vec<MotionPhase, TRAIL_CAPACITY>,
    busy: Arc<AtomicBool>,
}

impl std::fmt::Debug for MotionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionController")
            .field("counts", &self.snapshot_counts())
            .field("phase", &self.phase)
            .field("rest", &self.rest)
            .finish_non_exhaustive()
    }
}

impl MotionController {
    /// Claim every driver pin from the session board and set the counters to
    /// the configured start value.
    pub fn new(session: Session, config: &LoadedConfig) -> Result<Self, ControllerError> {
        let Session {
            mut board,
            delay,
            stage,
        } = session;
        let params = &config.steering.actuators;

        let mut actuators = heapless::Vec::new();
        for (id, pins) in (0..).zip(params.pins.iter()) {
            let direction_line = board.output(pins.direction)?;
            let pulse_line = board.output(pins.pulse)?;
            let actuator = Actuator::new(
                id,
                params.start_steps,
                params.max_steps,
                direction_line,
                pulse_line,
            );
            let _ = actuators.push(actuator);
        }

        let stage = stage.map(|s| {
            StageSetpoint::new(s, config.steering.stage.clone().unwrap_or_default())
        });

        info!(
            "Motion controller ready on '{}': {} actuators at {} steps, stage {}",
            board.name(),
            actuators.len(),
            params.start_steps,
            if stage.is_some() { "attached" } else { "absent" },
        );

        Ok(Self {
            actuators,
            geometry: config.geometry.clone(),
            timer: PulseTimer::new(params.pulse_width(), delay),
            stage,
            rest: RestTarget::new(params.rest_steps),
            phase: MotionPhase::Idle,
            trail: heapless::Vec::new(),
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Execute one command, blocking until its pulse train is done.
    ///
    /// Planar directions pick the actuator sets and the displacement picks
    /// the step counts. The push set is tried first; only when it would run
    /// past `max_steps` is the same displacement solved for the pull set.
    /// Counters change only after every pulse has been issued, and the busy
    /// flag is up for the whole train.
    ///
    /// `Home`, `ResetOrigin` and `ClearOrigin` dispatch to [`Self::home`],
    /// [`Self::reset_origin`] and [`Self::clear_origin`]. A zero displacement
    /// (or one that rounds to zero steps) succeeds without pulsing.
    ///
    /// # Errors
    ///
    /// Rejections are values, not faults; the controller stays usable and no
    /// line or counter has changed:
    /// - `RejectReason::NoDirection` for `Direction::Invalid`
    /// - `RejectReason::OutOfRange` when neither push nor pull fits the
    ///   remaining travel
    pub fn apply(&mut self, cmd: MoveCommand) -> Result<MoveOutcome, RejectReason> {
        self.trail.clear();
        match cmd.direction {
            Direction::Invalid => {
                self.enter(MotionPhase::Rejected);
                self.enter(MotionPhase::Idle);
                debug!("Command without direction ignored");
                Err(RejectReason::NoDirection)
            }
            Direction::Home => Ok(MoveOutcome::Homed(self.home())),
            Direction::ResetOrigin => Ok(MoveOutcome::OriginReset {
                origin: self.reset_origin(),
            }),
            Direction::ClearOrigin => Ok(MoveOutcome::OriginCleared {
                rest: self.clear_origin(),
            }),
            direction => self.apply_planar(direction, cmd.dx, cmd.dy),
        }
    }

    fn apply_planar(
        &mut self,
        direction: Direction,
        dx: i32,
        dy: i32,
    ) -> Result<MoveOutcome, RejectReason> {
        self.enter(MotionPhase::GeometryLookup);
        let push = self.geometry.decomposer(direction, Role::Push).copied();
        let pull = self.geometry.decomposer(direction, Role::Pull).copied();
        let (Some(push), Some(pull)) = (push, pull) else {
            self.enter(MotionPhase::Rejected);
            self.enter(MotionPhase::Idle);
            return Err(RejectReason::NoDirection);
        };

        self.enter(MotionPhase::Decompose);
        let push_plan = push.plan(dx, dy);

        self.enter(MotionPhase::BoundsCheck(Role::Push));
        let (role, plan) = if self.feasible(&push_plan, Role::Push) {
            (Role::Push, push_plan)
        } else {
            let pull_plan = pull.plan(dx, dy);
            self.enter(MotionPhase::BoundsCheck(Role::Pull));
            if self.feasible(&pull_plan, Role::Pull) {
                (Role::Pull, pull_plan)
            } else {
                self.enter(MotionPhase::Rejected);
                self.enter(MotionPhase::Idle);
                warn!(
                    "Rejected {direction} ({dx}, {dy}): push [{push_plan}] and pull [{pull_plan}] exceed travel, counts {:?}",
                    self.snapshot_counts()
                );
                return Err(RejectReason::OutOfRange { direction, dx, dy });
            }
        };

        self.enter(MotionPhase::Stepping(role));
        let pulses = self.execute(&plan, role);
        self.enter(MotionPhase::Idle);

        info!(
            "Moved {direction} by ({dx}, {dy}): {role} [{plan}], {pulses} pulses, counts {:?}",
            self.snapshot_counts()
        );
        Ok(MoveOutcome::Moved {
            direction,
            role,
            steps: plan,
        })
    }

    fn feasible(&self, plan: &StepPlan, role: Role) -> bool {
        plan.iter().all(|e| {
            self.actuators
                .get(usize::from(e.actuator))
                .is_some_and(|a| a.can_move(role, e.steps))
        })
    }

    /// Drive `plan` and then update the counters. Returns pulses issued.
    fn execute(&mut self, plan: &StepPlan, role: Role) -> u64 {
        if plan.is_idle() {
            return 0;
        }

        self.busy.store(true, Ordering::Release);
        let pulses = match plan.as_slice() {
            [] => 0,
            [one] => drive_single(
                &mut self.actuators[usize::from(one.actuator)],
                one.steps,
                role,
                &mut self.timer,
            ),
            [first, second, ..] => {
                let (a, b) = pair_mut(&mut self.actuators, first.actuator, second.actuator);
                drive(a, first.steps, b, second.steps, role, &mut self.timer)
            }
        };
        for e in plan.iter() {
            self.actuators[usize::from(e.actuator)].adjust_count(role.signed(e.steps));
        }
        self.busy.store(false, Ordering::Release);
        pulses
    }

    /// Return every actuator to the rest position through the common midpoint.
    pub fn home(&mut self) -> HomeReport {
        self.trail.clear();
        self.enter(MotionPhase::Homing);
        self.busy.store(true, Ordering::Release);

        let stage_restored = match self.stage.as_mut() {
            Some(stage) => match stage.return_to_initial() {
                Ok(position) => {
                    debug!("Stage returned to {position}");
                    true
                }
                Err(e) => {
                    warn!("Stage did not accept initial position: {e}");
                    false
                }
            },
            None => false,
        };

        let counts = self.snapshot_counts();
        let midpoint = homing::midpoint(&counts);
        let rest = self.rest.get();

        for target in [midpoint, rest] {
            for actuator in self.actuators.iter_mut() {
                if let Err(e) = actuator.run_to(target, &mut self.timer) {
                    warn!("Homing: {e}");
                }
            }
        }

        self.busy.store(false, Ordering::Release);
        self.enter(MotionPhase::Idle);
        info!("Homed from {counts:?} via {midpoint} to {rest}");

        HomeReport {
            midpoint,
            rest,
            counts,
            stage_restored,
        }
    }

    /// Capture the current midpoint as the rest position for later homing.
    pub fn reset_origin(&mut self) -> u32 {
        let origin = homing::midpoint(&self.snapshot_counts());
        self.rest.capture(origin);
        info!("Origin captured at {origin}");
        origin
    }

    /// Drop a captured origin so homing targets the configured rest position
    /// again. Returns that rest position.
    pub fn clear_origin(&mut self) -> u32 {
        match self.rest.clear() {
            Some(origin) => info!("Origin {origin} cleared"),
            None => debug!("No origin captured, nothing to clear"),
        }
        self.rest.get()
    }

    pub fn snapshot_counts(&self) -> [u32; ACTUATOR_COUNT] {
        std::array::from_fn(|i| self.actuators.get(i).map_or(0, Actuator::get_count))
    }

    #[inline]
    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    /// Phases visited by the last command.
    pub fn trail(&self) -> &[MotionPhase] {
        &self.trail
    }

    /// Rest position the next `home()` will target.
    pub fn rest_target(&self) -> u32 {
        self.rest.get()
    }

    pub fn geometry(&self) -> &ActuationGeometry {
        &self.geometry
    }

    /// Flag raised while a pulse train runs. Cloned handles stay live.
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.busy)
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn enter(&mut self, phase: MotionPhase) {
        trace!(?phase, "phase");
        self.phase = phase;
        let _ = self.trail.push(phase);
    }
}

/// Two distinct mutable actuators from the bank. Geometry validation
/// guarantees `i != j`.
fn pair_mut(
    bank: &mut [Actuator],
    i: ActuatorId,
    j: ActuatorId,
) -> (&mut Actuator, &mut Actuator) {
    let (i, j) = (usize::from(i), usize::from(j));
    if i < j {
        let (lo, hi) = bank.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = bank.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}
