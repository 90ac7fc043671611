//! Real-time placement of the pulse thread.
//!
//! Pulse timing is only as good as the thread holding the lines, so the
//! supervisor loop runs on its own `needle-pulse` thread and only that
//! thread is pinned and raised to `SCHED_FIFO`. Scheduling policy and CPU
//! affinity are per-thread on Linux and inherited by children, which is why
//! the console reader and the signal handler must be started before
//! [`spawn_pulse_thread`] and never from inside it.
//!
//! Memory locking is process-wide and is requested separately through
//! [`lock_memory`].
//!
//! Without the `rt` feature every step is logged and skipped, so the
//! simulation binary runs unprivileged.

use std::io;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the thread that owns the controller.
pub const PULSE_THREAD_NAME: &str = "needle-pulse";

/// Stack reserved for the pulse thread.
pub const PULSE_STACK_BYTES: usize = 512 * 1024;

/// Part of the pulse stack touched before the first pulse.
const PREFAULT_BYTES: usize = 128 * 1024;

/// `SCHED_FIFO` priority range accepted by Linux.
pub const FIFO_PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 1..=99;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtError {
    #[error("SCHED_FIFO priority {0} outside 1..=99")]
    Priority(i32),

    #[error("{step} failed: {reason}")]
    Os { step: &'static str, reason: String },
}

/// One placement step, in the order the pulse thread applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtStep {
    PinCore(usize),
    Fifo(i32),
}

/// Where and how the pulse thread should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RtPolicy {
    pub cpu_core: Option<usize>,
    pub fifo_priority: Option<i32>,
}

impl RtPolicy {
    /// Policy that leaves the pulse thread as spawned.
    pub const fn inherit() -> Self {
        Self {
            cpu_core: None,
            fifo_priority: None,
        }
    }

    /// Reject priorities outside the `SCHED_FIFO` range.
    pub fn new(cpu_core: Option<usize>, fifo_priority: Option<i32>) -> Result<Self, RtError> {
        if let Some(p) = fifo_priority {
            if !FIFO_PRIORITY_RANGE.contains(&p) {
                return Err(RtError::Priority(p));
            }
        }
        Ok(Self {
            cpu_core,
            fifo_priority,
        })
    }

    pub fn is_inherit(&self) -> bool {
        self.cpu_core.is_none() && self.fifo_priority.is_none()
    }

    /// Steps to apply. The core is pinned before the priority is raised so
    /// the thread never competes at FIFO priority on a foreign core.
    pub fn steps(&self) -> heapless::Vec<RtStep, 2> {
        let mut steps = heapless::Vec::new();
        if let Some(core) = self.cpu_core {
            let _ = steps.push(RtStep::PinCore(core));
        }
        if let Some(priority) = self.fifo_priority {
            let _ = steps.push(RtStep::Fifo(priority));
        }
        steps
    }

    /// Apply every step to the calling thread. Returns the steps that took
    /// effect; without the `rt` feature that is none of them.
    pub fn apply_to_current_thread(&self) -> Result<heapless::Vec<RtStep, 2>, RtError> {
        let mut applied = heapless::Vec::new();
        for step in self.steps() {
            if apply_step(step)? {
                let _ = applied.push(step);
            }
        }
        Ok(applied)
    }
}

#[cfg(feature = "rt")]
fn apply_step(step: RtStep) -> Result<bool, RtError> {
    match step {
        RtStep::PinCore(core) => {
            use nix::sched::{CpuSet, sched_setaffinity};
            use nix::unistd::Pid;

            let mut set = CpuSet::new();
            set.set(core).map_err(|e| RtError::Os {
                step: "CpuSet::set",
                reason: e.to_string(),
            })?;
            // pid 0 is the calling thread, not the process
            sched_setaffinity(Pid::from_raw(0), &set).map_err(|e| RtError::Os {
                step: "sched_setaffinity",
                reason: e.to_string(),
            })?;
        }
        RtStep::Fifo(priority) => {
            let param = libc::sched_param {
                sched_priority: priority,
            };
            // SAFETY: `param` is a valid sched_param for the duration of the call.
            let ret =
                unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
            if ret != 0 {
                return Err(RtError::Os {
                    step: "pthread_setschedparam",
                    reason: io::Error::from_raw_os_error(ret).to_string(),
                });
            }
        }
    }
    Ok(true)
}

#[cfg(not(feature = "rt"))]
fn apply_step(step: RtStep) -> Result<bool, RtError> {
    debug!(?step, "rt feature disabled, step skipped");
    Ok(false)
}

/// Lock current and future pages of the process.
///
/// Returns `false` without the `rt` feature.
#[cfg(feature = "rt")]
pub fn lock_memory() -> Result<bool, RtError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE).map_err(|e| RtError::Os {
        step: "mlockall",
        reason: e.to_string(),
    })?;
    Ok(true)
}

#[cfg(not(feature = "rt"))]
pub fn lock_memory() -> Result<bool, RtError> {
    Ok(false)
}

/// Touch the top of the pulse stack so the first pulses do not fault pages in.
fn touch_stack() {
    let mut scratch = [0u8; PREFAULT_BYTES];
    scratch.fill(0xA5);
    std::hint::black_box(&mut scratch);
}

/// Run `body` on a dedicated pulse thread placed according to `policy`.
///
/// The policy is applied from inside the new thread, so the caller and every
/// thread it already started keep their own scheduling. A placement failure
/// is returned through the join handle and `body` is not run.
///
/// # Errors
///
/// Spawning fails only when the OS refuses a new thread.
pub fn spawn_pulse_thread<T, F>(
    policy: RtPolicy,
    body: F,
) -> io::Result<JoinHandle<Result<T, RtError>>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(PULSE_THREAD_NAME.into())
        .stack_size(PULSE_STACK_BYTES)
        .spawn(move || {
            let applied = policy.apply_to_current_thread()?;
            touch_stack();
            if policy.is_inherit() {
                debug!("Pulse thread running with inherited scheduling");
            } else if applied.len() == policy.steps().len() {
                info!(?applied, "Pulse thread placed");
            } else {
                warn!(requested = ?policy.steps(), ?applied, "Pulse thread placement incomplete");
            }
            Ok(body())
        })
}
