//! Common re-exports.
//!
//! ```rust
//! use needle_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::steering::config::{
    ActuatorConfig, ActuatorId, ActuatorSet, GeometryConfig, InputConfig, StageConfig,
    SteeringConfig,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{ACTUATOR_COUNT, DEFAULT_CONFIG_PATH, PLANAR_DIRECTIONS};

// ─── Steering ───────────────────────────────────────────────────────
pub use crate::steering::command::{MoveCommand, TipPose};
pub use crate::steering::direction::Direction;
pub use crate::steering::input::{InputError, InputMapper};
