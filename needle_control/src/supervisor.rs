//! Supervisory loop around the motion controller.
//!
//! Each iteration logs the newest tip pose (if a tracker is attached), waits
//! briefly for the newest command, applies it and logs the outcome.
//! Rejections are counted and the loop carries on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use needle_common::consts::ACTUATOR_COUNT;
use needle_common::steering::command::{MoveCommand, TipPose};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::controller::{MotionController, MoveOutcome};
use crate::error::RejectReason;
use crate::mailbox::Mailbox;

/// Default wait for a command per iteration.
pub const DEFAULT_POLL: Duration = Duration::from_millis(100);

/// Totals for one supervisor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub moves: u64,
    pub homings: u64,
    pub origin_resets: u64,
    pub rejected_out_of_range: u64,
    pub rejected_no_direction: u64,
    /// Commands overwritten in the mailbox before they were applied.
    pub superseded: u64,
    pub poses_seen: u64,
    pub final_counts: [u32; ACTUATOR_COUNT],
}

/// What one `step()` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Idle,
    Applied(MoveOutcome),
    Rejected(RejectReason),
}

pub struct Supervisor {
    controller: MotionController,
    commands: Arc<Mailbox<MoveCommand>>,
    telemetry: Option<Arc<Mailbox<TipPose>>>,
    poll: Duration,
    summary: SessionSummary,
}

impl Supervisor {
    pub fn new(controller: MotionController, commands: Arc<Mailbox<MoveCommand>>) -> Self {
        Self {
            controller,
            commands,
            telemetry: None,
            poll: DEFAULT_POLL,
            summary: SessionSummary::default(),
        }
    }

    /// Attach the advisory tip-pose feed.
    pub fn with_telemetry(mut self, telemetry: Arc<Mailbox<TipPose>>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn controller(&self) -> &MotionController {
        &self.controller
    }

    /// One iteration: log telemetry, take the newest command, apply it.
    pub fn step(&mut self) -> StepResult {
        if let Some(pose) = self.telemetry.as_ref().and_then(|t| t.try_take()) {
            self.summary.poses_seen += 1;
            debug!(
                "Tip at ({}, {}) heading {:.1}°",
                pose.position[0],
                pose.position[1],
                pose.heading_deg()
            );
        }

        let Some(cmd) = self.commands.take_timeout(self.poll) else {
            return StepResult::Idle;
        };

        match self.controller.apply(cmd) {
            Ok(outcome) => {
                match outcome {
                    MoveOutcome::Moved { .. } => self.summary.moves += 1,
                    MoveOutcome::Homed(_) => self.summary.homings += 1,
                    MoveOutcome::OriginReset { .. } | MoveOutcome::OriginCleared { .. } => {
                        self.summary.origin_resets += 1
                    }
                }
                debug!("Applied: {outcome}");
                StepResult::Applied(outcome)
            }
            Err(reason) => {
                match reason {
                    RejectReason::NoDirection => self.summary.rejected_no_direction += 1,
                    RejectReason::OutOfRange { .. } => {
                        self.summary.rejected_out_of_range += 1;
                        warn!("Command rejected: {reason}");
                    }
                }
                StepResult::Rejected(reason)
            }
        }
    }

    /// Loop until `running` drops or the command mailbox is closed and drained.
    pub fn run(&mut self, running: &AtomicBool) -> SessionSummary {
        info!("Supervisor running (poll {:?})", self.poll);
        while running.load(Ordering::SeqCst) && !self.commands.is_drained() {
            self.step();
        }
        let summary = self.summary();
        info!(
            "Supervisor stopped: {} moves, {} rejected, {} superseded, counts {:?}",
            summary.moves,
            summary.rejected_out_of_range + summary.rejected_no_direction,
            summary.superseded,
            summary.final_counts
        );
        summary
    }

    /// Totals so far, with the current counters.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            superseded: self.commands.superseded(),
            final_counts: self.controller.snapshot_counts(),
            ..self.summary.clone()
        }
    }

    pub fn into_controller(self) -> MotionController {
        self.controller
    }
}
