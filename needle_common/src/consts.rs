//! Workspace-wide constants.
//!
//! Single source of truth for the rig topology and the default limits.
//! Every value that can change between rigs also has a config field; the
//! constants here are the defaults and hard bounds for those fields.

use static_assertions::const_assert;

/// Number of tendon actuators on the needle guide. Fixed topology.
pub const ACTUATOR_COUNT: usize = 4;

/// Number of planar compass directions in the geometry table.
pub const PLANAR_DIRECTIONS: usize = 8;

/// Default upper travel limit per actuator [steps].
pub const DEFAULT_MAX_STEPS: u32 = 400;

/// Hard ceiling for the configurable travel limit [steps].
pub const MAX_STEPS_LIMIT: u32 = 100_000;

/// Default counter value assigned to every actuator at startup [steps].
pub const DEFAULT_START_STEPS: u32 = 200;

/// Default rest position used by homing [steps].
pub const DEFAULT_REST_STEPS: u32 = 0;

/// Minimum pulse width required by the stepper drivers [ms].
pub const DEFAULT_PULSE_WIDTH_MS: u64 = 10;

/// Bounds for the configurable pulse width [ms].
pub const PULSE_WIDTH_MS_MIN: u64 = 1;
pub const PULSE_WIDTH_MS_MAX: u64 = 1000;

/// Default operator sensitivity (scales every requested displacement).
pub const DEFAULT_SENSITIVITY: f64 = 1.0;

/// Analog stick radius below which no direction is resolved.
pub const DEFAULT_DEADZONE: f64 = 0.8;

/// Max `| |x| - |y| |` of a stick reading that still counts as a diagonal.
pub const DEFAULT_DIAGONAL_MARGIN: f64 = 0.4;

/// Displacement requested per operator input when no magnitude is given [steps].
pub const DEFAULT_STEP_SIZE: u32 = 20;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/needle.toml";

const_assert!(ACTUATOR_COUNT == 4);
const_assert!(DEFAULT_START_STEPS <= DEFAULT_MAX_STEPS);
const_assert!(DEFAULT_MAX_STEPS <= MAX_STEPS_LIMIT);
const_assert!(PULSE_WIDTH_MS_MIN <= DEFAULT_PULSE_WIDTH_MS);
const_assert!(DEFAULT_PULSE_WIDTH_MS <= PULSE_WIDTH_MS_MAX);
