//! Toggle animator: alternates the two LEDs of the toggle pair.
//!
//! Each firing flips the phase and drives LED A to the phase level and
//! LED B to its complement, then re-arms one toggle period after the
//! scheduled fire time.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app::ports::{OutputLine, Rearm, TimerCallback};
use crate::fsm::Mode;
use crate::fsm::context::Shared;

/// Which LED of the pair is lit.  Written only by the toggle callback
/// while Toggle runs.
pub struct TogglePhase {
    a_lit: AtomicBool,
}

impl TogglePhase {
    /// Starts with LED A lit, matching the lines' acquisition levels.
    pub const fn new() -> Self {
        Self {
            a_lit: AtomicBool::new(true),
        }
    }

    pub fn reset(&self) {
        self.a_lit.store(true, Ordering::Relaxed);
    }

    pub fn is_a_lit(&self) -> bool {
        self.a_lit.load(Ordering::Relaxed)
    }

    /// Flip and return the new phase.
    pub fn flip(&self) -> bool {
        !self.a_lit.fetch_xor(true, Ordering::Relaxed)
    }
}

impl Default for TogglePhase {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer callback for the toggle timer.
pub fn toggle_callback<O: OutputLine + 'static>(shared: Arc<Shared<O>>) -> TimerCallback {
    Box::new(move || {
        if shared.mode.get() != Mode::Toggle {
            return Rearm::Stop;
        }
        let a_lit = shared.toggle.flip();
        shared.outputs.led_a.set(a_lit);
        shared.outputs.led_b.set(!a_lit);
        Rearm::After(shared.timing.toggle_period)
    })
}
