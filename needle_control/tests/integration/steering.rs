//! Integration test: command → decomposition → pulse trains → counters.

use std::time::Duration;

use needle_common::config::ConfigLoader;
use needle_common::steering::command::MoveCommand;
use needle_common::steering::config::SteeringConfig;
use needle_common::steering::direction::Direction;
use needle_control::actuator::Role;
use needle_control::config::LoadedConfig;
use needle_control::controller::{MotionController, MotionPhase, MoveOutcome};
use needle_control::error::{ControllerError, RejectReason};
use needle_control::hal::HalError;
use needle_control::session::Session;

use super::{default_rig, rig};

// Default pin map: (direction, pulse) per actuator.
const DIR_PINS: [u8; 4] = [7, 5, 3, 9];
const PULSE_PINS: [u8; 4] = [6, 4, 2, 8];

fn role_of(outcome: &MoveOutcome) -> Option<Role> {
    match outcome {
        MoveOutcome::Moved { role, .. } => Some(*role),
        _ => None,
    }
}

// ── Saturation ──────────────────────────────────────────────────────

#[test]
fn repeated_right_saturates_push_then_pull_then_rejects() {
    let (mut c, probe) = default_rig();
    let cmd = MoveCommand::new(Direction::Right, 200, 0);

    let expected = [
        (Role::Push, [200, 300, 300, 200]),
        (Role::Push, [200, 400, 400, 200]),
        (Role::Pull, [100, 400, 400, 100]),
        (Role::Pull, [0, 400, 400, 0]),
    ];
    for (i, (role, counts)) in expected.into_iter().enumerate() {
        let outcome = c.apply(cmd).unwrap_or_else(|e| panic!("move {i} rejected: {e}"));
        assert_eq!(role_of(&outcome), Some(role), "move {i}");
        assert_eq!(c.snapshot_counts(), counts, "move {i}");
    }

    let pulses_before = probe.board.total_pulses();
    assert_eq!(
        c.apply(cmd),
        Err(RejectReason::OutOfRange {
            direction: Direction::Right,
            dx: 200,
            dy: 0
        })
    );
    assert_eq!(c.snapshot_counts(), [0, 400, 400, 0]);
    assert_eq!(probe.board.total_pulses(), pulses_before);
    assert_eq!(c.phase(), MotionPhase::Idle);
    assert!(c.trail().contains(&MotionPhase::Rejected));
}

#[test]
fn opposite_direction_recovers_after_saturation() {
    let (mut c, _) = default_rig();
    for _ in 0..4 {
        c.apply(MoveCommand::new(Direction::Right, 200, 0)).unwrap();
    }
    // Left pushes 0 and 3 back out.
    let outcome = c.apply(MoveCommand::new(Direction::Left, -100, 0)).unwrap();
    assert_eq!(role_of(&outcome), Some(Role::Push));
    assert_eq!(c.snapshot_counts(), [50, 400, 400, 50]);
}

// ── Pulse trains ────────────────────────────────────────────────────

#[test]
fn uneven_pair_is_interleaved_with_exact_counts() {
    let (mut c, probe) = default_rig();
    // Up pushes 2 and 3: (6, 40) = -23·(-1,-1) + -17·(1,-1)
    let outcome = c.apply(MoveCommand::new(Direction::Up, 6, 40)).unwrap();

    let MoveOutcome::Moved { role, steps, .. } = outcome else {
        panic!("expected a move");
    };
    assert_eq!(role, Role::Push);
    assert_eq!(steps.steps_for(2), 23);
    assert_eq!(steps.steps_for(3), 17);
    assert_eq!(probe.board.pulses(PULSE_PINS[2]), 23);
    assert_eq!(probe.board.pulses(PULSE_PINS[3]), 17);
    assert_eq!(probe.board.pulses(PULSE_PINS[0]), 0);
    assert_eq!(c.snapshot_counts(), [200, 200, 223, 217]);
}

#[test]
fn pulse_timing_is_two_widths_per_step() {
    let (mut c, probe) = default_rig();
    c.apply(MoveCommand::new(Direction::Down, 0, -40)).unwrap();
    // 20 + 20 pulses at 10 ms high + 10 ms low
    assert_eq!(probe.delay.elapsed(), Duration::from_millis(40 * 20));
}

#[test]
fn direction_lines_follow_role() {
    let (mut c, probe) = default_rig();
    c.apply(MoveCommand::new(Direction::Right, 20, 0)).unwrap();
    assert!(probe.board.level(DIR_PINS[1]));
    assert!(probe.board.level(DIR_PINS[2]));

    for _ in 0..3 {
        c.apply(MoveCommand::new(Direction::Right, 200, 0)).unwrap();
    }
    // the last two fell back to pulling 0 and 3
    assert!(!probe.board.level(DIR_PINS[0]));
    assert!(!probe.board.level(DIR_PINS[3]));
    assert!(probe.board.level(DIR_PINS[1]));
    assert_eq!(c.snapshot_counts(), [0, 310, 310, 0]);
}

#[test]
fn pulse_lines_rest_low_after_a_move() {
    let (mut c, probe) = default_rig();
    c.apply(MoveCommand::new(Direction::UpLeft, -15, 15)).unwrap();
    assert!(PULSE_PINS.iter().all(|&pin| !probe.board.level(pin)));
    assert_eq!(probe.board.pulses(PULSE_PINS[3]), 15);
}

// ── No-ops ──────────────────────────────────────────────────────────

#[test]
fn zero_displacement_is_idempotent() {
    let (mut c, probe) = default_rig();
    for direction in Direction::PLANAR {
        c.apply(MoveCommand::new(direction, 0, 0)).unwrap();
    }
    assert_eq!(c.snapshot_counts(), [200; 4]);
    assert_eq!(probe.board.total_pulses(), 0);
    assert_eq!(probe.delay.elapsed(), Duration::ZERO);
}

#[test]
fn invalid_direction_touches_nothing() {
    let (mut c, probe) = default_rig();
    c.apply(MoveCommand::new(Direction::Up, 0, 30)).unwrap();
    let counts = c.snapshot_counts();
    let pulses = probe.board.total_pulses();

    assert_eq!(
        c.apply(MoveCommand::new(Direction::Invalid, 50, 50)),
        Err(RejectReason::NoDirection)
    );
    assert_eq!(c.snapshot_counts(), counts);
    assert_eq!(probe.board.total_pulses(), pulses);
}

#[test]
fn sensitivity_scaled_input_drives_fewer_steps() {
    use needle_common::steering::input::InputMapper;

    let mut config = SteeringConfig::default();
    config.input.sensitivity = 0.5;
    let mapper = InputMapper::new(&config.input);
    let (mut c, _) = rig(config, false);

    let cmd = mapper.parse_line("right 40").unwrap().unwrap();
    c.apply(cmd).unwrap();
    assert_eq!(c.snapshot_counts(), [200, 210, 210, 200]);
}

// ── Custom geometry ─────────────────────────────────────────────────

const AXIS_GEOMETRY: &str = r#"
[actuators]
max_steps = 100
start_steps = 50

[geometry]
basis = [[0.0, 1.0], [1.0, 0.0], [0.0, -1.0], [-1.0, 0.0]]

[geometry.pull]
up = [0]
up_right = [0, 1]
right = [1]
down_right = [1, 2]
down = [2]
down_left = [2, 3]
left = [3]
up_left = [3, 0]

[geometry.push]
up = [2]
up_right = [2, 3]
right = [3]
down_right = [3, 0]
down = [0]
down_left = [0, 1]
left = [1]
up_left = [1, 2]
"#;

#[test]
fn axis_aligned_geometry_moves_single_actuator_exactly() {
    let config = SteeringConfig::from_toml_str(AXIS_GEOMETRY).unwrap();
    let (mut c, _) = rig(config, false);

    // Up pushes actuator 2 by exactly dy.
    c.apply(MoveCommand::new(Direction::Up, 0, 30)).unwrap();
    assert_eq!(c.snapshot_counts(), [50, 50, 80, 50]);

    // Push saturates at 100, falls back to pulling actuator 0.
    c.apply(MoveCommand::new(Direction::Up, 0, 30)).unwrap();
    assert_eq!(c.snapshot_counts(), [20, 50, 80, 50]);
}

// ── Startup failures ────────────────────────────────────────────────

#[test]
fn pin_missing_on_board_is_fatal() {
    let mut config = SteeringConfig::default();
    config.actuators.pins[2].pulse = 45;
    let loaded = LoadedConfig::from_steering(config).unwrap();
    let (session, _) = Session::simulated(false);

    assert!(matches!(
        MotionController::new(session, &loaded),
        Err(ControllerError::Hal(HalError::PinUnavailable(45)))
    ));
}

#[test]
fn inconsistent_geometry_is_fatal() {
    let mut config = SteeringConfig::default();
    config.geometry.push.down = config.geometry.pull.down.clone();
    assert!(matches!(
        LoadedConfig::from_steering(config),
        Err(ControllerError::Geometry(_))
    ));
}
