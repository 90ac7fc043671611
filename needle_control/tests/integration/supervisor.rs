//! Integration test: mailbox hand-off between threads and the busy flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use needle_common::steering::command::{MoveCommand, TipPose};
use needle_common::steering::config::SteeringConfig;
use needle_common::steering::direction::Direction;
use needle_control::config::LoadedConfig;
use needle_control::controller::MotionController;
use needle_control::hal::Delay;
use needle_control::hal::simulation::SimulatedBoard;
use needle_control::mailbox::Mailbox;
use needle_control::rt::{PULSE_THREAD_NAME, RtPolicy, spawn_pulse_thread};
use needle_control::session::Session;
use needle_control::supervisor::{StepResult, Supervisor};

use super::default_rig;

/// Delay that records whether the controller's busy flag was up while
/// a pulse edge was being held.
#[derive(Clone, Default)]
struct BusyProbe {
    flag: Arc<OnceLock<Arc<AtomicBool>>>,
    holds_while_busy: Arc<AtomicU64>,
    holds_total: Arc<AtomicU64>,
}

impl Delay for BusyProbe {
    fn hold(&mut self, _duration: Duration) {
        self.holds_total.fetch_add(1, Ordering::Relaxed);
        if self.flag.get().is_some_and(|f| f.load(Ordering::Acquire)) {
            self.holds_while_busy.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[test]
fn busy_flag_is_raised_for_the_whole_pulse_train() {
    let probe = BusyProbe::default();
    let session = Session::new(
        Box::new(SimulatedBoard::new()),
        Box::new(probe.clone()),
        None,
    );
    let loaded = LoadedConfig::from_steering(SteeringConfig::default()).unwrap();
    let mut c = MotionController::new(session, &loaded).unwrap();
    let flag = c.busy_flag();
    assert!(probe.flag.set(Arc::clone(&flag)).is_ok());

    c.apply(MoveCommand::new(Direction::Left, -30, 0)).unwrap();

    let total = probe.holds_total.load(Ordering::Relaxed);
    assert_eq!(total, 30 * 2);
    assert_eq!(probe.holds_while_busy.load(Ordering::Relaxed), total);
    assert!(!flag.load(Ordering::Acquire));
}

#[test]
fn producer_thread_feeds_the_supervisor() {
    let (controller, _) = default_rig();
    let commands = Arc::new(Mailbox::new());
    let mut sup =
        Supervisor::new(controller, Arc::clone(&commands)).with_poll(Duration::from_millis(5));

    let producer = {
        let commands = Arc::clone(&commands);
        thread::spawn(move || {
            commands.post(MoveCommand::new(Direction::Right, 20, 0));
            while commands.has_pending() {
                thread::sleep(Duration::from_millis(1));
            }
            commands.close();
        })
    };

    let running = AtomicBool::new(true);
    let summary = sup.run(&running);
    producer.join().unwrap();

    assert_eq!(summary.moves, 1);
    assert_eq!(summary.superseded, 0);
    assert_eq!(summary.final_counts, [200, 210, 210, 200]);
}

#[test]
fn stale_commands_are_dropped() {
    let (controller, _) = default_rig();
    let commands = Arc::new(Mailbox::new());
    let mut sup =
        Supervisor::new(controller, Arc::clone(&commands)).with_poll(Duration::from_millis(1));

    for dx in [10, 20, 30, 40] {
        commands.post(MoveCommand::new(Direction::Right, dx, 0));
    }
    assert!(matches!(sup.step(), StepResult::Applied(_)));

    let summary = sup.summary();
    assert_eq!(summary.moves, 1);
    assert_eq!(summary.superseded, 3);
    // only the last one (40 → 20 per actuator) was driven
    assert_eq!(summary.final_counts, [200, 220, 220, 200]);
}

#[test]
fn tip_pose_feed_never_moves_actuators() {
    let (controller, probe) = default_rig();
    let commands = Arc::new(Mailbox::new());
    let poses = Arc::new(Mailbox::new());
    let mut sup = Supervisor::new(controller, Arc::clone(&commands))
        .with_telemetry(Arc::clone(&poses))
        .with_poll(Duration::from_millis(1));

    for x in 0..5 {
        poses.post(TipPose {
            position: [300 + x, 240],
            orientation: [1.0, 0.0],
        });
        assert_eq!(sup.step(), StepResult::Idle);
    }
    assert_eq!(sup.summary().poses_seen, 5);
    assert_eq!(probe.board.total_pulses(), 0);
}

#[test]
fn supervisor_runs_on_the_pulse_thread_after_helpers() {
    let (controller, probe) = default_rig();
    let commands = Arc::new(Mailbox::new());
    let running = Arc::new(AtomicBool::new(true));

    // input side is up before the pulse thread exists
    let producer = {
        let commands = Arc::clone(&commands);
        thread::spawn(move || {
            commands.post(MoveCommand::new(Direction::Down, 0, -20));
            while commands.has_pending() {
                thread::sleep(Duration::from_millis(1));
            }
            commands.close();
            thread::current().name().map(str::to_owned)
        })
    };

    let mut sup =
        Supervisor::new(controller, Arc::clone(&commands)).with_poll(Duration::from_millis(5));
    let pulse = {
        let running = Arc::clone(&running);
        spawn_pulse_thread(RtPolicy::inherit(), move || {
            let summary = sup.run(&running);
            (summary, thread::current().name().map(str::to_owned))
        })
        .unwrap()
    };

    let (summary, pulse_name) = pulse.join().unwrap().unwrap();
    let producer_name = producer.join().unwrap();

    assert_eq!(pulse_name.as_deref(), Some(PULSE_THREAD_NAME));
    assert_ne!(producer_name.as_deref(), Some(PULSE_THREAD_NAME));
    assert_eq!(summary.moves, 1);
    // Down pushes 0 and 1 by 10 each
    assert_eq!(summary.final_counts, [210, 210, 200, 200]);
    assert_eq!(probe.board.total_pulses(), 20);
}
