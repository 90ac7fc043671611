//! Values exchanged between the input/tracking contexts and the controller.

use serde::{Deserialize, Serialize};

use super::direction::Direction;

/// One operator movement request.
///
/// `dx`/`dy` are in actuator steps, already scaled by the operator
/// sensitivity. `+y` points up in the camera image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveCommand {
    pub direction: Direction,
    pub dx: i32,
    pub dy: i32,
}

impl MoveCommand {
    pub const fn new(direction: Direction, dx: i32, dy: i32) -> Self {
        Self { direction, dx, dy }
    }

    /// Control-code command without a displacement.
    pub const fn control(direction: Direction) -> Self {
        Self::new(direction, 0, 0)
    }

    /// Command that carries no resolvable direction.
    pub const fn invalid() -> Self {
        Self::control(Direction::Invalid)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Needle-tip estimate published by the tracking context.
///
/// Advisory only: logged, never fed back into the decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TipPose {
    /// Tip position in image pixels.
    pub position: [i32; 2],
    /// Unit vector along the needle shaft near the tip.
    pub orientation: [f64; 2],
}

impl TipPose {
    /// Orientation as an angle from the image +x axis [deg].
    pub fn heading_deg(&self) -> f64 {
        self.orientation[1].atan2(self.orientation[0]).to_degrees()
    }
}
