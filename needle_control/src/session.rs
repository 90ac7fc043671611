//! Hardware session.
//!
//! Everything the controller touches in the outside world, built once at
//! startup and moved into [`crate::controller::MotionController`]. There is
//! no global board handle.

use crate::hal::simulation::{SimulatedBoard, SimulatedDelay, SimulatedStage};
use crate::hal::{Board, Delay, LinearStage};

pub struct Session {
    pub board: Box<dyn Board>,
    pub delay: Box<dyn Delay>,
    pub stage: Option<Box<dyn LinearStage>>,
}

impl Session {
    pub fn new(
        board: Box<dyn Board>,
        delay: Box<dyn Delay>,
        stage: Option<Box<dyn LinearStage>>,
    ) -> Self {
        Self {
            board,
            delay,
            stage,
        }
    }

    /// Fully simulated session. The probe keeps handles onto the simulated
    /// pins, delay and stage for inspection.
    pub fn simulated(with_stage: bool) -> (Self, SimulationProbe) {
        let probe = SimulationProbe {
            board: SimulatedBoard::new(),
            delay: SimulatedDelay::new(),
            stage: with_stage.then(SimulatedStage::new),
        };
        let session = Self::new(
            Box::new(probe.board.clone()),
            Box::new(probe.delay.clone()),
            probe
                .stage
                .clone()
                .map(|s| Box::new(s) as Box<dyn LinearStage>),
        );
        (session, probe)
    }

    /// Replace the delay, e.g. with a wall-clock one for realistic timing.
    pub fn with_delay(mut self, delay: Box<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("board", &self.board.name())
            .field("stage", &self.stage.is_some())
            .finish_non_exhaustive()
    }
}

/// Read-back handles of a simulated session.
#[derive(Debug, Clone)]
pub struct SimulationProbe {
    pub board: SimulatedBoard,
    pub delay: SimulatedDelay,
    pub stage: Option<SimulatedStage>,
}
