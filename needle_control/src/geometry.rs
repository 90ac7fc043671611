//! Actuation geometry: which actuators move the tip in which direction.
//!
//! Built once from `[geometry]` and validated before any motion:
//!
//! 1. Every set has one or two members, all `< ACTUATOR_COUNT`, no repeats.
//! 2. Pull and push sets of a direction are disjoint.
//! 3. Two-member pull/push sets together cover all four actuators.
//! 4. Basis vectors of a pair are not parallel, a single vector is not zero.
//! 5. Pulling moves the tip toward the direction and pushing does too: the
//!    direction's unit offset decomposes with positive coefficients on the
//!    pull side and negative ones on the push side.

use bitflags::bitflags;
use needle_common::consts::ACTUATOR_COUNT;
use needle_common::steering::config::{ActuatorId, ActuatorSet, GeometryConfig};
use needle_common::steering::direction::Direction;
use thiserror::Error;
use tracing::debug;

use crate::actuator::Role;
use crate::decompose::Decomposer;

bitflags! {
    /// Membership mask over the four actuators.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ActuatorMask: u8 {
        const A0 = 1 << 0;
        const A1 = 1 << 1;
        const A2 = 1 << 2;
        const A3 = 1 << 3;
    }
}

static_assertions::const_assert_eq!(
    ActuatorMask::all().bits().count_ones() as usize,
    ACTUATOR_COUNT
);

impl ActuatorMask {
    pub fn from_set(set: &[ActuatorId]) -> Self {
        set.iter().fold(Self::empty(), |m, &id| {
            m | Self::from_bits_truncate(1u8.checked_shl(u32::from(id)).unwrap_or(0))
        })
    }
}

/// Inconsistent geometry table. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{direction} {role} set has {len} members, expected 1 or 2")]
    SetSize {
        direction: Direction,
        role: Role,
        len: usize,
    },

    #[error("{direction} {role} set references unknown actuator {id}")]
    UnknownActuator {
        direction: Direction,
        role: Role,
        id: ActuatorId,
    },

    #[error("{direction} {role} set lists actuator {id} twice")]
    Duplicate {
        direction: Direction,
        role: Role,
        id: ActuatorId,
    },

    #[error("{direction}: actuator set overlap between pull and push ({overlap:?})")]
    Overlap {
        direction: Direction,
        overlap: ActuatorMask,
    },

    #[error("{direction}: two-member pull and push sets must cover all actuators")]
    NotPartition { direction: Direction },

    #[error("{direction} {role} set has parallel or zero basis vectors")]
    Degenerate { direction: Direction, role: Role },

    #[error("{direction} {role} set moves the tip away from {direction}")]
    WrongSign { direction: Direction, role: Role },
}

#[derive(Debug, Clone, Copy)]
struct DirectionEntry {
    pull: Decomposer,
    push: Decomposer,
}

/// Validated geometry with a precomputed solver per direction and role.
#[derive(Debug, Clone)]
pub struct ActuationGeometry {
    basis: [[f64; 2]; ACTUATOR_COUNT],
    pull: [ActuatorSet; 8],
    push: [ActuatorSet; 8],
    entries: heapless::Vec<DirectionEntry, 8>,
}

impl ActuationGeometry {
    /// Validate the `[geometry]` table and precompute a solver per direction
    /// and role.
    ///
    /// Runs once at startup. After it succeeds, decomposition cannot fail at
    /// runtime: every planar direction has a non-degenerate solver for both
    /// roles, and either set moves the tip toward that direction.
    ///
    /// # Errors
    ///
    /// Checks run per direction in this order, and the first failure is
    /// returned:
    /// - `GeometryError::SetSize` if a set has no member or more than two
    /// - `GeometryError::UnknownActuator` if an index is not below
    ///   `ACTUATOR_COUNT`
    /// - `GeometryError::Duplicate` if a set lists the same actuator twice
    /// - `GeometryError::Overlap` if an actuator appears in both pull and push
    /// - `GeometryError::NotPartition` if either set has two members and
    ///   together they do not cover all four actuators
    /// - `GeometryError::Degenerate` if a pair's basis vectors are parallel,
    ///   or a single basis vector is zero
    /// - `GeometryError::WrongSign` if the direction's unit offset does not
    ///   decompose with positive pull (negative push) coefficients
    pub fn from_config(config: &GeometryConfig) -> Result<Self, GeometryError> {
        let mut pull: [ActuatorSet; 8] = Default::default();
        let mut push: [ActuatorSet; 8] = Default::default();
        let mut entries = heapless::Vec::new();

        for (i, direction) in Direction::PLANAR.into_iter().enumerate() {
            let pull_set = table_set(config, direction, Role::Pull);
            let push_set = table_set(config, direction, Role::Push);
            let pull_mask = check_set(direction, Role::Pull, pull_set)?;
            let push_mask = check_set(direction, Role::Push, push_set)?;

            let overlap = pull_mask & push_mask;
            if !overlap.is_empty() {
                return Err(GeometryError::Overlap { direction, overlap });
            }
            let paired = pull_set.len() == 2 || push_set.len() == 2;
            if paired && (pull_mask | push_mask) != ActuatorMask::all() {
                return Err(GeometryError::NotPartition { direction });
            }

            let entry = DirectionEntry {
                pull: solver(config, direction, Role::Pull, pull_set)?,
                push: solver(config, direction, Role::Push, push_set)?,
            };
            pull[i] = pull_set.clone();
            push[i] = push_set.clone();
            let _ = entries.push(entry);
        }

        debug!("Actuation geometry validated for {} directions", entries.len());
        Ok(Self {
            basis: config.basis,
            pull,
            push,
            entries,
        })
    }

    /// Actuators whose tendons shorten to move toward `direction`.
    pub fn pull_set(&self, direction: Direction) -> Option<&[ActuatorId]> {
        direction.planar_index().map(|i| self.pull[i].as_slice())
    }

    /// Actuators whose tendons lengthen to move toward `direction`.
    pub fn push_set(&self, direction: Direction) -> Option<&[ActuatorId]> {
        direction.planar_index().map(|i| self.push[i].as_slice())
    }

    pub fn set(&self, direction: Direction, role: Role) -> Option<&[ActuatorId]> {
        match role {
            Role::Pull => self.pull_set(direction),
            Role::Push => self.push_set(direction),
        }
    }

    pub fn basis_vector(&self, actuator: ActuatorId) -> Option<[f64; 2]> {
        self.basis.get(usize::from(actuator)).copied()
    }

    /// Solver for `direction`'s `role` set, `None` for control codes.
    pub fn decomposer(&self, direction: Direction, role: Role) -> Option<&Decomposer> {
        let entry = &self.entries[direction.planar_index()?];
        Some(match role {
            Role::Pull => &entry.pull,
            Role::Push => &entry.push,
        })
    }
}

fn table_set(config: &GeometryConfig, direction: Direction, role: Role) -> &ActuatorSet {
    let table = match role {
        Role::Pull => &config.pull,
        Role::Push => &config.push,
    };
    // PLANAR directions always have an entry.
    table.get(direction).unwrap_or(&EMPTY_SET)
}

static EMPTY_SET: ActuatorSet = heapless::Vec::new();

fn check_set(
    direction: Direction,
    role: Role,
    set: &ActuatorSet,
) -> Result<ActuatorMask, GeometryError> {
    if !(1..=2).contains(&set.len()) {
        return Err(GeometryError::SetSize {
            direction,
            role,
            len: set.len(),
        });
    }
    let mut mask = ActuatorMask::empty();
    for &id in set {
        if usize::from(id) >= ACTUATOR_COUNT {
            return Err(GeometryError::UnknownActuator { direction, role, id });
        }
        let bit = ActuatorMask::from_set(&[id]);
        if mask.contains(bit) {
            return Err(GeometryError::Duplicate { direction, role, id });
        }
        mask |= bit;
    }
    Ok(mask)
}

fn solver(
    config: &GeometryConfig,
    direction: Direction,
    role: Role,
    set: &ActuatorSet,
) -> Result<Decomposer, GeometryError> {
    let basis = |id: ActuatorId| config.basis[usize::from(id)];
    let decomposer = match set.as_slice() {
        &[a] => Decomposer::single(a, basis(a)),
        &[a, b] => Decomposer::pair([a, b], basis(a), basis(b)),
        _ => {
            return Err(GeometryError::SetSize {
                direction,
                role,
                len: set.len(),
            });
        }
    }
    .map_err(|_| GeometryError::Degenerate { direction, role })?;

    let (ox, oy) = direction.offset();
    let consistent = decomposer
        .coefficients(f64::from(ox), f64::from(oy))
        .iter()
        .all(|&(_, c)| match role {
            Role::Pull => c > 0.0,
            Role::Push => c < 0.0,
        });
    if !consistent {
        return Err(GeometryError::WrongSign { direction, role });
    }
    Ok(decomposer)
}
