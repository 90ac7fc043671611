//! Configuration loading for the controller.
//!
//! Parses `needle.toml` into a `SteeringConfig`, checks parameter bounds and
//! builds the validated `ActuationGeometry`. Any failure here is fatal.

use std::path::Path;

use needle_common::config::ConfigLoader;
use needle_common::steering::config::SteeringConfig;
use tracing::info;

use crate::error::ControllerError;
use crate::geometry::ActuationGeometry;

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Validated configuration, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub steering: SteeringConfig,
    pub geometry: ActuationGeometry,
}

impl LoadedConfig {
    /// Validate an already parsed config.
    pub fn from_steering(steering: SteeringConfig) -> Result<Self, ControllerError> {
        steering.validate()?;
        let geometry = ActuationGeometry::from_config(&steering.geometry)?;
        Ok(Self { steering, geometry })
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the steering configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ControllerError> {
    let steering = SteeringConfig::load(path)?;
    let loaded = LoadedConfig::from_steering(steering)?;
    info!(
        "Loaded {}: max_steps={}, start_steps={}, pulse_width={}ms",
        path.display(),
        loaded.steering.actuators.max_steps,
        loaded.steering.actuators.start_steps,
        loaded.steering.actuators.pulse_width_ms,
    );
    Ok(loaded)
}
