//! Mode state machine and stop-before-start transition logic.
//!
//! ```text
//!            startup              press
//!   ┌──────┐ ───────▶ ┌────────┐ ───────▶ ┌─────────┐
//!   │ Idle │          │ Toggle │          │ Breathe │
//!   └──────┘ ───────▶ └────────┘ ◀─────── └─────────┘
//!              press               press
//! ```
//!
//! The current [`Mode`] lives in an atomic [`ModeCell`].  The
//! [`ModeController`] is its only writer; timer callbacks only read it to
//! decide whether to re-arm.  That self-check is a best-effort liveness
//! aid: correctness comes from [`TimerHandle::cancel`] waiting for any
//! in-flight callback before outputs and state are touched.
//!
//! Callers serialize `start`/`stop`/`cycle`: startup runs before the
//! interrupt is registered, the interrupt layer never runs the button
//! handler concurrently with itself, and shutdown unregisters the
//! interrupt before stopping modes.

pub mod context;

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::Arc;

use context::{ControllerStatus, Shared};

use crate::app::ports::{OutputLine, TimerHandle};

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// Mutually-exclusive behaviour currently driving the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    Idle = 0,
    Toggle = 1,
    Breathe = 2,
}

impl Mode {
    /// Convert a raw `u8` back to `Mode`.  Unknown values read as `Idle`,
    /// which makes every callback stop.
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Toggle,
            2 => Self::Breathe,
            _ => Self::Idle,
        }
    }

    /// Mode entered when the button is pressed in `self`.
    pub fn next_on_press(self) -> Self {
        match self {
            Self::Toggle => Self::Breathe,
            Self::Breathe | Self::Idle => Self::Toggle,
        }
    }
}

/// Atomically readable [`Mode`].
pub struct ModeCell(AtomicU8);

impl ModeCell {
    pub const fn new(mode: Mode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    pub fn get(&self) -> Mode {
        Mode::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, mode: Mode) {
        self.0.store(mode as u8, Ordering::Release);
    }

    /// Switch to `Idle` only if `mode` is current.  Returns whether it was.
    pub fn leave(&self, mode: Mode) -> bool {
        self.0
            .compare_exchange(mode as u8, Mode::Idle as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// Mode controller
// ---------------------------------------------------------------------------

/// The timers each mode arms.
pub struct ModeTimers<T> {
    pub toggle: T,
    pub tick: T,
    pub ramp: T,
}

/// Single source of truth for which timers run.
pub struct ModeController<O, T> {
    shared: Arc<Shared<O>>,
    timers: ModeTimers<T>,
    transitions: AtomicU32,
}

impl<O: OutputLine, T: TimerHandle> ModeController<O, T> {
    /// Wrap state and timers whose callbacks already hold `shared`.
    pub fn new(shared: Arc<Shared<O>>, timers: ModeTimers<T>) -> Self {
        Self {
            shared,
            timers,
            transitions: AtomicU32::new(0),
        }
    }

    pub fn mode(&self) -> Mode {
        self.shared.mode.get()
    }

    pub fn shared(&self) -> &Shared<O> {
        &self.shared
    }

    /// Reset `mode`'s state, drive its initial levels and arm its timers.
    ///
    /// Whatever mode is running is stopped first.
    pub fn start(&self, mode: Mode) {
        let current = self.mode();
        if current != Mode::Idle {
            self.stop(current);
        }

        let s = &*self.shared;
        match mode {
            Mode::Idle => {}
            Mode::Toggle => {
                s.ramp.reset();
                s.tick.reset();
                s.toggle.reset();
                s.outputs.led_a.set(true);
                s.outputs.led_b.set(false);
                s.outputs.pwm.set(false);
                s.mode.set(Mode::Toggle);
                self.timers.toggle.start(s.timing.toggle_period);
            }
            Mode::Breathe => {
                s.ramp.reset();
                s.tick.reset();
                s.outputs.all_off();
                s.mode.set(Mode::Breathe);
                self.timers.tick.start(s.timing.tick_interval);
                self.timers.ramp.start(s.timing.step_interval);
            }
        }
    }

    /// Cancel `mode`'s timers (waiting for in-flight callbacks), drive its
    /// outputs off and reset its state.
    ///
    /// Stopping a mode that is not active changes nothing observable.
    pub fn stop(&self, mode: Mode) {
        let s = &*self.shared;
        match mode {
            Mode::Idle => {}
            Mode::Toggle => {
                let was_active = s.mode.leave(Mode::Toggle);
                self.timers.toggle.cancel();
                s.outputs.led_a.set(false);
                s.outputs.led_b.set(false);
                if was_active {
                    s.toggle.reset();
                }
            }
            Mode::Breathe => {
                s.mode.leave(Mode::Breathe);
                self.timers.tick.cancel();
                self.timers.ramp.cancel();
                s.ramp.reset();
                s.tick.reset();
                s.outputs.pwm.set(false);
            }
        }
    }

    /// Handle one button press: stop the current mode, start the next.
    pub fn cycle(&self) -> (Mode, Mode) {
        let from = self.mode();
        let to = from.next_on_press();
        self.stop(from);
        self.start(to);
        self.transitions.fetch_add(1, Ordering::Relaxed);
        (from, to)
    }

    /// Stop both modes and drive every output off.  Idempotent.
    pub fn stop_all(&self) {
        self.stop(Mode::Toggle);
        self.stop(Mode::Breathe);
        self.shared.outputs.all_off();
        self.shared.mode.set(Mode::Idle);
    }

    pub fn status(&self) -> ControllerStatus {
        let s = &*self.shared;
        ControllerStatus {
            mode: s.mode.get(),
            led_a_lit: s.toggle.is_a_lit(),
            duty: s.ramp.duty(),
            direction: s.ramp.direction(),
            counter: s.tick.counter(),
            transitions: self.transitions.load(Ordering::Relaxed),
        }
    }
}
