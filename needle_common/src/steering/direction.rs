//! Operator direction codes.
//!
//! Eight planar compass directions plus four out-of-band control codes.
//! Planar ordinals (0..=7, clockwise from `Up`) index the actuation geometry
//! table and must not be reordered.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::PLANAR_DIRECTIONS;

/// Direction requested by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    UpRight = 1,
    Right = 2,
    DownRight = 3,
    Down = 4,
    DownLeft = 5,
    Left = 6,
    UpLeft = 7,
    /// Return every actuator to the rest position.
    Home = 8,
    /// Capture the current midpoint as the new rest position.
    ResetOrigin = 9,
    /// Drop a captured origin; homing targets the configured rest again.
    ClearOrigin = 10,
    /// No resolvable direction (no input, or input inside the deadzone).
    Invalid = 255,
}

impl Direction {
    /// All planar directions in ordinal order.
    pub const PLANAR: [Direction; PLANAR_DIRECTIONS] = [
        Self::Up,
        Self::UpRight,
        Self::Right,
        Self::DownRight,
        Self::Down,
        Self::DownLeft,
        Self::Left,
        Self::UpLeft,
    ];

    /// Convert from raw `u8`. Returns `None` for unknown codes.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Up),
            1 => Some(Self::UpRight),
            2 => Some(Self::Right),
            3 => Some(Self::DownRight),
            4 => Some(Self::Down),
            5 => Some(Self::DownLeft),
            6 => Some(Self::Left),
            7 => Some(Self::UpLeft),
            8 => Some(Self::Home),
            9 => Some(Self::ResetOrigin),
            10 => Some(Self::ClearOrigin),
            255 => Some(Self::Invalid),
            _ => None,
        }
    }

    /// Geometry table index for planar directions, `None` for control codes.
    #[inline]
    pub const fn planar_index(self) -> Option<usize> {
        let code = self as u8;
        if (code as usize) < PLANAR_DIRECTIONS {
            Some(code as usize)
        } else {
            None
        }
    }

    #[inline]
    pub const fn is_planar(self) -> bool {
        self.planar_index().is_some()
    }

    /// Cardinal directions move along exactly one image axis.
    #[inline]
    pub const fn is_cardinal(self) -> bool {
        matches!(self, Self::Up | Self::Right | Self::Down | Self::Left)
    }

    /// Unit grid offset `(x, y)` with `+y` pointing up; `(0, 0)` for control codes.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::UpRight => (1, 1),
            Self::Right => (1, 0),
            Self::DownRight => (1, -1),
            Self::Down => (0, -1),
            Self::DownLeft => (-1, -1),
            Self::Left => (-1, 0),
            Self::UpLeft => (-1, 1),
            Self::Home | Self::ResetOrigin | Self::ClearOrigin | Self::Invalid => (0, 0),
        }
    }

    /// Opposite compass direction. Control codes map to themselves.
    pub const fn opposite(self) -> Self {
        match self.planar_index() {
            Some(i) => Self::PLANAR[(i + PLANAR_DIRECTIONS / 2) % PLANAR_DIRECTIONS],
            None => self,
        }
    }

    /// Mirror across the vertical axis (used when the camera image is flipped).
    pub const fn mirror_x(self) -> Self {
        match self {
            Self::UpRight => Self::UpLeft,
            Self::Right => Self::Left,
            Self::DownRight => Self::DownLeft,
            Self::DownLeft => Self::DownRight,
            Self::Left => Self::Right,
            Self::UpLeft => Self::UpRight,
            other => other,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::UpRight => "up-right",
            Self::Right => "right",
            Self::DownRight => "down-right",
            Self::Down => "down",
            Self::DownLeft => "down-left",
            Self::Left => "left",
            Self::UpLeft => "up-left",
            Self::Home => "home",
            Self::ResetOrigin => "reset-origin",
            Self::ClearOrigin => "clear-origin",
            Self::Invalid => "invalid",
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::Invalid
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown direction name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction '{0}'")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    /// Accepts the display names, compact forms (`upright`, `ur`) and
    /// `snake_case` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();

        let dir = match key.as_str() {
            "up" | "u" | "n" => Self::Up,
            "upright" | "ur" | "ne" => Self::UpRight,
            "right" | "r" | "e" => Self::Right,
            "downright" | "dr" | "se" => Self::DownRight,
            "down" | "d" | "s" => Self::Down,
            "downleft" | "dl" | "sw" => Self::DownLeft,
            "left" | "l" | "w" => Self::Left,
            "upleft" | "ul" | "nw" => Self::UpLeft,
            "home" | "init" => Self::Home,
            "resetorigin" | "origin" => Self::ResetOrigin,
            "clearorigin" => Self::ClearOrigin,
            _ => return Err(UnknownDirection(s.trim().to_string())),
        };
        Ok(dir)
    }
}
