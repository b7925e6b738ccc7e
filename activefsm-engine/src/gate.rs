//! Blocking primitives used by the worker.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Manual-reset gate: while closed, [`PauseGate::wait`] blocks.
pub struct PauseGate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl PauseGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self {
            open: Mutex::new(true),
            cond: Condvar::new(),
        }
    }

    pub fn close(&self) {
        *self.open.lock() = false;
    }

    pub fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Blocks until the gate is open.
    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot latch used to observe worker termination and to sleep
/// interruptibly.
pub struct Latch {
    set: Mutex<bool>,
    cond: Condvar,
}

impl Latch {
    pub fn new() -> Self {
        Self {
            set: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub fn set(&self) {
        *self.set.lock() = true;
        self.cond.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Waits for the latch. `None` waits forever.
    ///
    /// Returns whether the latch is set.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut set = self.set.lock();
        match timeout {
            None => {
                while !*set {
                    self.cond.wait(&mut set);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !*set {
                    if self.cond.wait_until(&mut set, deadline).timed_out() {
                        break;
                    }
                }
                *set
            }
        }
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}
