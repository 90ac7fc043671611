//! Property tests: travel bounds, rejection no-ops, decomposition and
//! interleave completeness over random inputs.

use needle_common::steering::command::MoveCommand;
use needle_common::steering::config::{GeometryConfig, SteeringConfig};
use needle_common::steering::direction::Direction;
use needle_control::actuator::Role;
use needle_control::controller::MoveOutcome;
use needle_control::geometry::ActuationGeometry;
use needle_control::scheduler::{Interleave, Lane};
use proptest::prelude::*;

use super::rig;

fn planar() -> impl Strategy<Value = Direction> {
    prop::sample::select(Direction::PLANAR.to_vec())
}

fn command() -> impl Strategy<Value = MoveCommand> {
    (planar(), -250i32..=250, -250i32..=250).prop_map(|(d, dx, dy)| MoveCommand::new(d, dx, dy))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn counters_stay_within_travel(
        max_steps in 50u32..=400,
        cmds in prop::collection::vec(command(), 1..40),
    ) {
        let mut config = SteeringConfig::default();
        config.actuators.max_steps = max_steps;
        config.actuators.start_steps = max_steps / 2;
        let (mut c, probe) = rig(config, false);

        for cmd in cmds {
            let counts_before = c.snapshot_counts();
            let pulses_before = probe.board.total_pulses();

            match c.apply(cmd) {
                Ok(MoveOutcome::Moved { role, steps, .. }) => {
                    let after = c.snapshot_counts();
                    for i in 0..4u8 {
                        let expected = i64::from(counts_before[usize::from(i)])
                            + role.signed(steps.steps_for(i));
                        prop_assert_eq!(i64::from(after[usize::from(i)]), expected);
                    }
                    prop_assert_eq!(
                        probe.board.total_pulses() - pulses_before,
                        u64::from(steps.total())
                    );
                }
                Ok(other) => prop_assert!(false, "unexpected outcome {:?}", other),
                Err(_) => {
                    prop_assert_eq!(c.snapshot_counts(), counts_before);
                    prop_assert_eq!(probe.board.total_pulses(), pulses_before);
                }
            }
            prop_assert!(c.snapshot_counts().iter().all(|&n| n <= max_steps));
        }
    }

    #[test]
    fn zero_commands_change_nothing(direction in planar(), start in 0u32..=400) {
        let mut config = SteeringConfig::default();
        config.actuators.start_steps = start;
        let (mut c, probe) = rig(config, false);

        prop_assert!(c.apply(MoveCommand::new(direction, 0, 0)).is_ok());
        prop_assert_eq!(c.snapshot_counts(), [start; 4]);
        prop_assert_eq!(probe.board.total_pulses(), 0);
    }

    #[test]
    fn decomposition_reconstructs_displacement(
        direction in planar(),
        dx in -1_000i32..=1_000,
        dy in -1_000i32..=1_000,
    ) {
        let geometry = ActuationGeometry::from_config(&GeometryConfig::default()).unwrap();
        for role in [Role::Push, Role::Pull] {
            let decomposer = geometry.decomposer(direction, role).unwrap();
            let coeffs = decomposer.coefficients(f64::from(dx), f64::from(dy));
            let plan = decomposer.plan(dx, dy);

            for &(id, coeff) in coeffs.iter() {
                let steps = f64::from(plan.steps_for(id));
                prop_assert!((steps - coeff.abs()).abs() <= 0.5);
            }

            // Pairs span the plane, so the coefficients rebuild (dx, dy).
            if coeffs.len() == 2 {
                let (mut x, mut y) = (0.0, 0.0);
                for &(id, coeff) in coeffs.iter() {
                    let v = geometry.basis_vector(id).unwrap();
                    x += coeff * v[0];
                    y += coeff * v[1];
                }
                prop_assert!((x - f64::from(dx)).abs() < 1e-6);
                prop_assert!((y - f64::from(dy)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn interleave_issues_every_step(a in 0u32..2_000, b in 0u32..2_000) {
        let seq: Vec<Lane> = Interleave::new(a, b).collect();
        prop_assert_eq!(seq.len(), (a + b) as usize);
        prop_assert_eq!(seq.iter().filter(|&&l| l == Lane::A).count(), a as usize);
        prop_assert_eq!(seq.iter().filter(|&&l| l == Lane::B).count(), b as usize);
    }

    #[test]
    fn interleave_never_starts_with_the_smaller_lane(a in 1u32..500, b in 1u32..500) {
        let first = Interleave::new(a, b).next();
        let expected = if a >= b { Lane::A } else { Lane::B };
        prop_assert_eq!(first, Some(expected));
    }
}
