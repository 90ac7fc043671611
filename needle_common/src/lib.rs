//! Needle Common Library
//!
//! Shared constants, configuration loading and steering types for the
//! tendon-driven needle workspace.
//!
//! # Module Structure
//!
//! - [`config`] - TOML loading trait, shared `[shared]` section, log level
//! - [`consts`] - rig topology and default limits
//! - [`steering`] - directions, commands, input mapping, steering config
//! - [`prelude`] - common re-exports
//!
//! # Usage
//!
//! ```rust
//! use needle_common::prelude::*;
//!
//! let cmd = MoveCommand::new(Direction::Right, 40, 0);
//! assert!(cmd.direction.is_planar());
//! assert_eq!(ACTUATOR_COUNT, 4);
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod steering;
