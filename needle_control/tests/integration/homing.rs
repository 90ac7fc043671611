//! Integration test: homing through the midpoint, origin capture, stage return.

use needle_common::steering::command::MoveCommand;
use needle_common::steering::config::{StageConfig, SteeringConfig};
use needle_common::steering::direction::Direction;
use needle_control::controller::{MotionPhase, MoveOutcome};
use needle_control::hal::HalError;
use needle_control::hal::simulation::StageWrite;

use super::{default_rig, rig};

#[test]
fn home_runs_through_midpoint_to_rest() {
    let (mut c, probe) = default_rig();
    c.apply(MoveCommand::new(Direction::Right, 200, 0)).unwrap();
    assert_eq!(c.snapshot_counts(), [200, 300, 300, 200]);
    let before = probe.board.total_pulses();

    let report = c.home();

    assert_eq!(report.counts, [200, 300, 300, 200]);
    assert_eq!(report.midpoint, 250);
    assert_eq!(report.rest, 0);
    assert!(!report.stage_restored);
    assert_eq!(c.snapshot_counts(), [0; 4]);
    // 50 to the midpoint and 250 down to rest, per actuator
    assert_eq!(probe.board.total_pulses() - before, 4 * 300);
    assert_eq!(c.phase(), MotionPhase::Idle);
    assert_eq!(c.trail().first(), Some(&MotionPhase::Homing));
}

#[test]
fn home_targets_configured_rest() {
    let mut config = SteeringConfig::default();
    config.actuators.rest_steps = 120;
    let (mut c, _) = rig(config, false);

    let report = c.home();
    assert_eq!(report.midpoint, 200);
    assert_eq!(report.rest, 120);
    assert_eq!(c.snapshot_counts(), [120; 4]);
}

#[test]
fn reset_origin_replaces_rest_target() {
    let (mut c, _) = default_rig();
    c.apply(MoveCommand::new(Direction::Right, 200, 0)).unwrap();

    let outcome = c.apply(MoveCommand::control(Direction::ResetOrigin)).unwrap();
    assert_eq!(outcome, MoveOutcome::OriginReset { origin: 250 });
    assert_eq!(c.rest_target(), 250);
    // capturing the origin moves nothing
    assert_eq!(c.snapshot_counts(), [200, 300, 300, 200]);

    c.apply(MoveCommand::new(Direction::Up, 0, 40)).unwrap();
    assert_eq!(c.snapshot_counts(), [200, 300, 320, 220]);

    let MoveOutcome::Homed(report) = c.apply(MoveCommand::control(Direction::Home)).unwrap()
    else {
        panic!("expected homing");
    };
    assert_eq!(report.midpoint, 260);
    assert_eq!(report.rest, 250);
    assert_eq!(c.snapshot_counts(), [250; 4]);
}

#[test]
fn cleared_origin_homes_to_configured_rest() {
    let (mut c, probe) = default_rig();
    c.apply(MoveCommand::control(Direction::ResetOrigin)).unwrap();
    assert_eq!(c.rest_target(), 200);
    let pulses = probe.board.total_pulses();

    let outcome = c.apply(MoveCommand::control(Direction::ClearOrigin)).unwrap();
    assert_eq!(outcome, MoveOutcome::OriginCleared { rest: 0 });
    assert_eq!(c.rest_target(), 0);
    assert_eq!(probe.board.total_pulses(), pulses);

    let report = c.home();
    assert_eq!(report.rest, 0);
    assert_eq!(c.snapshot_counts(), [0; 4]);
}

#[test]
fn home_returns_stage_to_initial_position() {
    let mut config = SteeringConfig::default();
    config.stage = Some(StageConfig {
        initial_pos: 10.0,
        ..StageConfig::default()
    });
    let (mut c, probe) = rig(config, true);
    let stage = probe.stage.expect("stage attached");

    let report = c.home();

    assert!(report.stage_restored);
    assert_eq!(
        stage.writes(),
        vec![StageWrite::Speed(0.2), StageWrite::Target(10.0)]
    );
}

#[test]
fn stage_fault_does_not_stop_actuator_homing() {
    let mut config = SteeringConfig::default();
    config.actuators.rest_steps = 50;
    config.stage = Some(StageConfig::default());
    let (mut c, probe) = rig(config, true);
    let stage = probe.stage.expect("stage attached");
    c.apply(MoveCommand::new(Direction::Left, -60, 0)).unwrap();
    assert_eq!(c.snapshot_counts(), [230, 200, 200, 230]);

    stage.fail_next(HalError::Communication("stage offline".into()));
    let report = c.home();

    assert!(!report.stage_restored);
    assert_eq!(report.midpoint, 215);
    assert_eq!(c.snapshot_counts(), [50; 4]);
    assert!(stage.writes().is_empty());
    assert!(!c.is_busy());
    assert_eq!(c.phase(), MotionPhase::Idle);

    // the next homing reaches the stage again
    assert!(c.home().stage_restored);
    assert_eq!(stage.target(), Some(3.0));
}

#[test]
fn home_at_rest_issues_no_pulses() {
    let mut config = SteeringConfig::default();
    config.actuators.start_steps = 0;
    let (mut c, probe) = rig(config, false);

    let report = c.home();
    assert_eq!(report.midpoint, 0);
    assert_eq!(probe.board.total_pulses(), 0);
    assert!(!c.is_busy());
}
