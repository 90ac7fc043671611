//! Insertion stage setpoints.
//!
//! The stage closes its own position loop. The controller only writes the
//! speed register once and then target positions, clamped to the configured
//! travel.

use needle_common::steering::config::StageConfig;
use tracing::{debug, warn};

use crate::hal::{HalError, LinearStage};

/// Stage handle plus its travel limits.
pub struct StageSetpoint {
    stage: Box<dyn LinearStage>,
    config: StageConfig,
    target: Option<f64>,
}

impl std::fmt::Debug for StageSetpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSetpoint")
            .field("config", &self.config)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl StageSetpoint {
    pub fn new(stage: Box<dyn LinearStage>, config: StageConfig) -> Self {
        Self {
            stage,
            config,
            target: None,
        }
    }

    /// Last target written, `None` before the first move.
    pub fn target(&self) -> Option<f64> {
        self.target
    }

    /// Write `position` as the new target, clamped into `[min_pos, max_pos]`.
    ///
    /// Returns the position actually written.
    pub fn move_to(&mut self, position: f64) -> Result<f64, HalError> {
        let clamped = position.clamp(self.config.min_pos, self.config.max_pos);
        if clamped != position {
            warn!(
                "Stage target {position} outside [{}, {}], clamped to {clamped}",
                self.config.min_pos, self.config.max_pos
            );
        }
        if self.target.is_none() {
            self.stage.write_speed(self.config.initial_speed)?;
        }
        self.stage.write_target(clamped)?;
        self.target = Some(clamped);
        debug!("Stage target set to {clamped}");
        Ok(clamped)
    }

    /// Move back to the configured initial position.
    pub fn return_to_initial(&mut self) -> Result<f64, HalError> {
        self.move_to(self.config.initial_pos)
    }
}
