//! Operator input → `MoveCommand`.
//!
//! Keyboard arrows, analog stick readings and console lines all end up here.
//! Reading the physical device is the caller's business; this module only
//! interprets values.

use thiserror::Error;

use super::command::MoveCommand;
use super::config::InputConfig;
use super::direction::{Direction, UnknownDirection};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error(transparent)]
    Direction(#[from] UnknownDirection),

    #[error("invalid number '{0}'")]
    Number(String),

    #[error("expected {expected}, got '{line}'")]
    Syntax { expected: &'static str, line: String },
}

/// Turns raw operator input into scaled movement commands.
#[derive(Debug, Clone)]
pub struct InputMapper {
    sensitivity: f64,
    deadzone: f64,
    diagonal_margin: f64,
    invert_x: bool,
    step_size: u32,
}

impl InputMapper {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            sensitivity: config.sensitivity,
            deadzone: config.deadzone,
            diagonal_margin: config.diagonal_margin,
            invert_x: config.invert_x,
            step_size: config.step_size,
        }
    }

    #[inline]
    pub fn step_size(&self) -> u32 {
        self.step_size
    }

    /// Direction from at most two pressed arrow keys.
    ///
    /// Up/down win over left/right when opposite keys are held together.
    pub fn from_arrow_keys(up: bool, down: bool, left: bool, right: bool) -> Direction {
        match (up, down, left, right) {
            (false, false, false, false) => Direction::Invalid,
            (true, _, true, _) => Direction::UpLeft,
            (true, _, _, true) => Direction::UpRight,
            (true, _, _, _) => Direction::Up,
            (false, true, true, _) => Direction::DownLeft,
            (false, true, _, true) => Direction::DownRight,
            (false, true, _, _) => Direction::Down,
            (false, false, true, _) => Direction::Left,
            (false, false, false, true) => Direction::Right,
        }
    }

    /// Direction from an analog stick reading (`+y` up, both axes in `[-1, 1]`).
    ///
    /// Readings inside the deadzone resolve to `Invalid`. Readings whose
    /// axis magnitudes differ by less than the diagonal margin resolve to a
    /// diagonal, everything else to the dominant cardinal.
    pub fn from_stick(&self, x: f64, y: f64) -> Direction {
        let x = if self.invert_x { -x } else { x };
        let (abs_x, abs_y) = (x.abs(), y.abs());

        if abs_x.hypot(abs_y) < self.deadzone {
            return Direction::Invalid;
        }

        if (abs_x - abs_y).abs() < self.diagonal_margin {
            match (x > 0.0, y > 0.0) {
                (true, true) => Direction::UpRight,
                (true, false) => Direction::DownRight,
                (false, true) => Direction::UpLeft,
                (false, false) => Direction::DownLeft,
            }
        } else if abs_y > abs_x {
            if y > 0.0 { Direction::Up } else { Direction::Down }
        } else if x > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    }

    /// Scaled command moving `magnitude` steps along each active axis of `direction`.
    pub fn command(&self, direction: Direction, magnitude: u32) -> MoveCommand {
        let (ox, oy) = direction.offset();
        let scaled = (f64::from(magnitude) * self.sensitivity).round() as i32;
        MoveCommand::new(direction, ox * scaled, oy * scaled)
    }

    /// Parse one console line.
    ///
    /// ```text
    /// <direction> [steps]     e.g. "right 40", "up-left"
    /// stick <x> <y>           analog reading, e.g. "stick 0.9 0.1"
    /// home | reset-origin
    /// reset-origin clear      forget the captured origin (also "clear-origin")
    /// ```
    ///
    /// Blank lines and `#` comments yield `Ok(None)`.
    pub fn parse_line(&self, line: &str) -> Result<Option<MoveCommand>, InputError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();

        if head.eq_ignore_ascii_case("stick") {
            let (Some(x), Some(y), None) = (words.next(), words.next(), words.next()) else {
                return Err(InputError::Syntax {
                    expected: "stick <x> <y>",
                    line: line.to_string(),
                });
            };
            let direction = self.from_stick(parse_number(x)?, parse_number(y)?);
            return Ok(Some(self.command(direction, self.step_size)));
        }

        let direction: Direction = head.parse()?;
        if !direction.is_planar() {
            return match (direction, words.next(), words.next()) {
                (_, None, _) => Ok(Some(MoveCommand::control(direction))),
                (Direction::ResetOrigin, Some(arg), None) if arg.eq_ignore_ascii_case("clear") => {
                    Ok(Some(MoveCommand::control(Direction::ClearOrigin)))
                }
                _ => Err(InputError::Syntax {
                    expected: "no arguments after a control command",
                    line: line.to_string(),
                }),
            };
        }

        let direction = if self.invert_x { direction.mirror_x() } else { direction };
        let magnitude = match (words.next(), words.next()) {
            (None, _) => self.step_size,
            (Some(steps), None) => steps
                .parse::<u32>()
                .map_err(|_| InputError::Number(steps.to_string()))?,
            (Some(_), Some(_)) => {
                return Err(InputError::Syntax {
                    expected: "<direction> [steps]",
                    line: line.to_string(),
                });
            }
        };
        Ok(Some(self.command(direction, magnitude)))
    }
}

fn parse_number(text: &str) -> Result<f64, InputError> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputError::Number(text.to_string()))
}
