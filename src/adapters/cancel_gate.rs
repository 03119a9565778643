//! Cancel-and-wait handshake for timers whose callbacks run on a foreign
//! task (esp_timer).
//!
//! The callback side stores `running` then loads `active`; the cancel side
//! stores `active` then loads `running`.  Both pairs are store-then-load on
//! different atomics, so every access is `SeqCst`: with anything weaker
//! both loads may observe stale values and a callback could start after
//! `wait_idle` has returned.
//!
//! ```text
//!   callback task                 cancelling task
//!   running = true                active = false
//!   if active { cb() }            while running { pause }
//!   running = false
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct CancelGate {
    active: AtomicBool,
    running: AtomicBool,
}

/// Held while a callback body runs; clears `running` on drop.
#[must_use]
pub struct Entered<'a>(&'a CancelGate);

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
    }
}

impl CancelGate {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    /// Returns whether the gate was armed.
    pub fn disarm(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Marks a callback as running if the gate is still armed.
    pub fn enter(&self) -> Option<Entered<'_>> {
        self.running.store(true, Ordering::SeqCst);
        if self.active.load(Ordering::SeqCst) {
            Some(Entered(self))
        } else {
            self.running.store(false, Ordering::SeqCst);
            None
        }
    }

    /// Blocks, calling `pause` between polls, until no callback is inside
    /// the gate.  Returns whether it had to wait.
    pub fn wait_idle(&self, mut pause: impl FnMut()) -> bool {
        let mut waited = false;
        while self.running.load(Ordering::SeqCst) {
            waited = true;
            pause();
        }
        waited
    }
}
