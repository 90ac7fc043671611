//! Steering types shared between the controller and its collaborators.
//!
//! Organized by concern: operator directions, command/telemetry values,
//! input interpretation and the steering configuration file.

pub mod command;
pub mod config;
pub mod direction;
pub mod input;
