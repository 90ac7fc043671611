//! Steering configuration (`config/needle.toml`).
//!
//! All sections are optional in TOML and fall back to the rig defaults in
//! [`crate::consts`]. Inside `[geometry]`, whole tables may be omitted but a
//! `pull`/`push` table that is present must be complete. `validate()` enforces parameter bounds; the geometry
//! table is checked for consistency by the control crate when it builds the
//! actuation geometry.
//!
//! ```toml
//! [shared]
//! service_name = "needle-steer"
//!
//! [actuators]
//! max_steps = 400
//! start_steps = 200
//! pulse_width_ms = 10
//!
//! [input]
//! sensitivity = 0.5
//! ```

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    ACTUATOR_COUNT, DEFAULT_DEADZONE, DEFAULT_DIAGONAL_MARGIN, DEFAULT_MAX_STEPS,
    DEFAULT_PULSE_WIDTH_MS, DEFAULT_REST_STEPS, DEFAULT_SENSITIVITY, DEFAULT_START_STEPS,
    DEFAULT_STEP_SIZE, MAX_STEPS_LIMIT, PULSE_WIDTH_MS_MAX, PULSE_WIDTH_MS_MIN,
};

use super::direction::Direction;

/// Actuator index, `0..ACTUATOR_COUNT`.
pub type ActuatorId = u8;

/// One or two actuators acting together for a direction.
pub type ActuatorSet = heapless::Vec<ActuatorId, 2>;

// ─── Top-Level Config ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SteeringConfig {
    #[serde(default)]
    pub shared: SharedConfig,

    #[serde(default)]
    pub actuators: ActuatorConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Linear stage setpoints. Absent when no stage is connected.
    #[serde(default)]
    pub stage: Option<StageConfig>,
}

impl SteeringConfig {
    /// Validate parameter bounds of every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.actuators.validate()?;
        self.input.validate()?;
        if let Some(stage) = &self.stage {
            stage.validate()?;
        }
        Ok(())
    }
}

// ─── Actuators ──────────────────────────────────────────────────────

/// Output pins driving one stepper driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinPair {
    pub direction: u8,
    pub pulse: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Upper travel limit per actuator [steps].
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Counter value assumed at process start [steps]. The operator must
    /// physically home the rig to match it.
    #[serde(default = "default_start_steps")]
    pub start_steps: u32,

    /// Rest position targeted by homing [steps].
    #[serde(default = "default_rest_steps")]
    pub rest_steps: u32,

    /// Pulse high time; the low time is the same [ms].
    #[serde(default = "default_pulse_width_ms")]
    pub pulse_width_ms: u64,

    /// Driver pins, indexed by actuator.
    #[serde(default = "default_pins")]
    pub pins: [PinPair; ACTUATOR_COUNT],
}

fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS
}
fn default_start_steps() -> u32 {
    DEFAULT_START_STEPS
}
fn default_rest_steps() -> u32 {
    DEFAULT_REST_STEPS
}
fn default_pulse_width_ms() -> u64 {
    DEFAULT_PULSE_WIDTH_MS
}
fn default_pins() -> [PinPair; ACTUATOR_COUNT] {
    [
        PinPair { direction: 7, pulse: 6 },
        PinPair { direction: 5, pulse: 4 },
        PinPair { direction: 3, pulse: 2 },
        PinPair { direction: 9, pulse: 8 },
    ]
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            start_steps: DEFAULT_START_STEPS,
            rest_steps: DEFAULT_REST_STEPS,
            pulse_width_ms: DEFAULT_PULSE_WIDTH_MS,
            pins: default_pins(),
        }
    }
}

impl ActuatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 || self.max_steps > MAX_STEPS_LIMIT {
            return Err(invalid(format!(
                "max_steps {} out of range [1, {}]",
                self.max_steps, MAX_STEPS_LIMIT
            )));
        }
        if self.start_steps > self.max_steps {
            return Err(invalid(format!(
                "start_steps {} exceeds max_steps {}",
                self.start_steps, self.max_steps
            )));
        }
        if self.rest_steps > self.max_steps {
            return Err(invalid(format!(
                "rest_steps {} exceeds max_steps {}",
                self.rest_steps, self.max_steps
            )));
        }
        if !(PULSE_WIDTH_MS_MIN..=PULSE_WIDTH_MS_MAX).contains(&self.pulse_width_ms) {
            return Err(invalid(format!(
                "pulse_width_ms {} out of range [{}, {}]",
                self.pulse_width_ms, PULSE_WIDTH_MS_MIN, PULSE_WIDTH_MS_MAX
            )));
        }

        let mut seen = HashSet::new();
        for (i, pair) in self.pins.iter().enumerate() {
            if pair.direction == pair.pulse {
                return Err(invalid(format!(
                    "actuator {i}: direction and pulse share pin {}",
                    pair.pulse
                )));
            }
            for pin in [pair.direction, pair.pulse] {
                if !seen.insert(pin) {
                    return Err(invalid(format!("actuator {i}: pin {pin} already assigned")));
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn pulse_width(&self) -> Duration {
        Duration::from_millis(self.pulse_width_ms)
    }
}

// ─── Input ──────────────────────────────────────────────────────────

/// Operator input scaling and stick interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Scales every requested displacement, `[0, 1]`.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,

    /// Stick radius treated as "no input", `[0, 1]`.
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,

    /// Tolerance on `| |x| - |y| |` for diagonal stick readings, `[0, 1]`.
    #[serde(default = "default_diagonal_margin")]
    pub diagonal_margin: f64,

    /// Mirror left/right (camera mounted flipped).
    #[serde(default)]
    pub invert_x: bool,

    /// Displacement per input when none is given [steps].
    #[serde(default = "default_step_size")]
    pub step_size: u32,
}

fn default_sensitivity() -> f64 {
    DEFAULT_SENSITIVITY
}
fn default_deadzone() -> f64 {
    DEFAULT_DEADZONE
}
fn default_diagonal_margin() -> f64 {
    DEFAULT_DIAGONAL_MARGIN
}
fn default_step_size() -> u32 {
    DEFAULT_STEP_SIZE
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            deadzone: DEFAULT_DEADZONE,
            diagonal_margin: DEFAULT_DIAGONAL_MARGIN,
            invert_x: false,
            step_size: DEFAULT_STEP_SIZE,
        }
    }
}

impl InputConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("sensitivity", self.sensitivity),
            ("deadzone", self.deadzone),
            ("diagonal_margin", self.diagonal_margin),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} {value} out of range [0, 1]")));
            }
        }
        if self.step_size == 0 {
            return Err(invalid("step_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

// ─── Geometry ───────────────────────────────────────────────────────

/// Actuator sets for every planar direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionTable {
    pub up: ActuatorSet,
    pub up_right: ActuatorSet,
    pub right: ActuatorSet,
    pub down_right: ActuatorSet,
    pub down: ActuatorSet,
    pub down_left: ActuatorSet,
    pub left: ActuatorSet,
    pub up_left: ActuatorSet,
}

impl DirectionTable {
    /// Build from sets listed in planar ordinal order.
    pub fn from_ordered(sets: [&[ActuatorId]; 8]) -> Self {
        let [up, up_right, right, down_right, down, down_left, left, up_left] = sets.map(to_set);
        Self {
            up,
            up_right,
            right,
            down_right,
            down,
            down_left,
            left,
            up_left,
        }
    }

    /// Set for a planar direction, `None` for control codes.
    pub fn get(&self, direction: Direction) -> Option<&ActuatorSet> {
        let set = match direction {
            Direction::Up => &self.up,
            Direction::UpRight => &self.up_right,
            Direction::Right => &self.right,
            Direction::DownRight => &self.down_right,
            Direction::Down => &self.down,
            Direction::DownLeft => &self.down_left,
            Direction::Left => &self.left,
            Direction::UpLeft => &self.up_left,
            Direction::Home
            | Direction::ResetOrigin
            | Direction::ClearOrigin
            | Direction::Invalid => return None,
        };
        Some(set)
    }
}

fn to_set(ids: &[ActuatorId]) -> ActuatorSet {
    ids.iter().copied().take(2).collect()
}

/// Pull/push table plus the per-actuator basis vectors.
///
/// `basis[i]` is the image-plane direction the tip moves when actuator `i`
/// pulls its tendon by one step.
///
/// `basis`, `pull` and `push` may each be omitted and then keep the rig
/// default. A `pull` or `push` table that is given must list all eight
/// directions: a partial table cannot be merged with the default without
/// breaking the pull/push partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub basis: [[f64; 2]; ACTUATOR_COUNT],
    pub pull: DirectionTable,
    pub push: DirectionTable,
}

impl Default for GeometryConfig {
    /// Tendons anchored on the four diagonals of the needle guide.
    /// Cardinal moves need two actuators per side, diagonal moves one.
    fn default() -> Self {
        Self {
            basis: [[1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0], [1.0, -1.0]],
            pull: DirectionTable::from_ordered([
                &[0, 1],
                &[0],
                &[0, 3],
                &[3],
                &[2, 3],
                &[2],
                &[1, 2],
                &[1],
            ]),
            push: DirectionTable::from_ordered([
                &[2, 3],
                &[2],
                &[1, 2],
                &[1],
                &[0, 1],
                &[0],
                &[0, 3],
                &[3],
            ]),
        }
    }
}

// ─── Linear Stage ───────────────────────────────────────────────────

/// Setpoints for the insertion stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Position restored by homing [mm].
    #[serde(default = "default_stage_initial_pos")]
    pub initial_pos: f64,
    /// Speed register value used for every move.
    #[serde(default = "default_stage_speed")]
    pub initial_speed: f64,
    #[serde(default = "default_stage_min")]
    pub min_pos: f64,
    #[serde(default = "default_stage_max")]
    pub max_pos: f64,
}

fn default_stage_initial_pos() -> f64 {
    3.0
}
fn default_stage_speed() -> f64 {
    0.2
}
fn default_stage_min() -> f64 {
    3.0
}
fn default_stage_max() -> f64 {
    50.0
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            initial_pos: default_stage_initial_pos(),
            initial_speed: default_stage_speed(),
            min_pos: default_stage_min(),
            max_pos: default_stage_max(),
        }
    }
}

impl StageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_pos >= self.max_pos {
            return Err(invalid(format!(
                "stage min_pos {} must be below max_pos {}",
                self.min_pos, self.max_pos
            )));
        }
        if !(self.min_pos..=self.max_pos).contains(&self.initial_pos) {
            return Err(invalid(format!(
                "stage initial_pos {} outside [{}, {}]",
                self.initial_pos, self.min_pos, self.max_pos
            )));
        }
        if self.initial_speed <= 0.0 || !self.initial_speed.is_finite() {
            return Err(invalid(format!(
                "stage initial_speed {} must be positive",
                self.initial_speed
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}
