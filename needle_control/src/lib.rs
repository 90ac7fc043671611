//! # Needle Control
//!
//! Tendon actuator control for a steerable needle. Four antagonistic stepper
//! actuators bend the tip in the image plane; this crate turns a 2-D move
//! request into synchronized pulse trains while keeping every actuator
//! inside its travel.
//!
//! ## Layers
//!
//! 1. **hal / session**: output lines, pulse delay and stage registers
//!    behind traits, built once into a `Session`
//! 2. **actuator**: bounded step counter per driver
//! 3. **geometry / decompose**: pull/push sets and basis vectors, solved
//!    into per-actuator step counts
//! 4. **scheduler**: interleaved two-lane pulse trains
//! 5. **controller**: push-then-pull feasibility, homing, origin capture
//! 6. **mailbox / supervisor**: last-writer-wins hand-off and the polling loop
//!
//! ## Example
//!
//! ```
//! use needle_common::prelude::*;
//! use needle_control::config::LoadedConfig;
//! use needle_control::controller::MotionController;
//! use needle_control::session::Session;
//!
//! let loaded = LoadedConfig::from_steering(SteeringConfig::default()).unwrap();
//! let (session, probe) = Session::simulated(false);
//! let mut controller = MotionController::new(session, &loaded).unwrap();
//!
//! controller.apply(MoveCommand::new(Direction::Right, 40, 0)).unwrap();
//! assert_eq!(controller.snapshot_counts(), [200, 220, 220, 200]);
//! assert_eq!(probe.board.total_pulses(), 40);
//! ```

pub mod actuator;
pub mod config;
pub mod controller;
pub mod decompose;
pub mod error;
pub mod geometry;
pub mod hal;
pub mod homing;
pub mod mailbox;
pub mod rt;
pub mod scheduler;
pub mod session;
pub mod stage;
pub mod supervisor;
