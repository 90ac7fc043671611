//! Shared rig for the integration tests.

mod homing;
mod properties;
mod steering;
mod supervisor;

use needle_common::steering::config::SteeringConfig;
use needle_control::config::LoadedConfig;
use needle_control::controller::MotionController;
use needle_control::session::{Session, SimulationProbe};

/// Controller over a fresh simulated session.
pub fn rig(config: SteeringConfig, with_stage: bool) -> (MotionController, SimulationProbe) {
    let loaded = LoadedConfig::from_steering(config).expect("config validates");
    let (session, probe) = Session::simulated(with_stage);
    let controller = MotionController::new(session, &loaded).expect("controller builds");
    (controller, probe)
}

pub fn default_rig() -> (MotionController, SimulationProbe) {
    rig(SteeringConfig::default(), false)
}
