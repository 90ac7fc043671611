//! Last-writer-wins hand-off between threads.
//!
//! Producers (input, tracking) overwrite the slot; the controller takes
//! whatever is newest when it gets around to it. A command posted while
//! another one is still pending replaces it and is counted as superseded.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    closed: bool,
    superseded: u64,
}

/// Single-slot mailbox.
///
/// Share it behind an `Arc`.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                closed: false,
                superseded: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// Store `value`, dropping any unread one. Returns `true` if a pending
    /// value was replaced. Posting to a closed mailbox is ignored.
    pub fn post(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if slot.closed {
            return false;
        }
        let replaced = slot.value.replace(value).is_some();
        if replaced {
            slot.superseded += 1;
        }
        drop(slot);
        self.ready.notify_one();
        replaced
    }

    /// Take the pending value without waiting.
    pub fn try_take(&self) -> Option<T> {
        self.slot.lock().value.take()
    }

    /// Take the pending value, waiting up to `timeout` for one to arrive.
    ///
    /// Returns early with `None` when the mailbox is closed and empty.
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let mut slot = self.slot.lock();
        if slot.value.is_none() && !slot.closed {
            // Spurious wake-ups just end the wait early.
            let _ = self.ready.wait_for(&mut slot, timeout);
        }
        slot.value.take()
    }

    /// No further posts are accepted. A pending value can still be taken.
    pub fn close(&self) {
        self.slot.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }

    /// A value is waiting to be taken.
    pub fn has_pending(&self) -> bool {
        self.slot.lock().value.is_some()
    }

    /// Closed and nothing left to take.
    pub fn is_drained(&self) -> bool {
        let slot = self.slot.lock();
        slot.closed && slot.value.is_none()
    }

    /// Values overwritten before anyone took them.
    pub fn superseded(&self) -> u64 {
        self.slot.lock().superseded
    }
}
