//! Software PWM engine ("breathing").
//!
//! Two cooperating timers synthesize PWM on a plain output line:
//!
//! ```text
//!   tick  (every tick_interval)  counter = (counter + 1) % resolution
//!                                pwm     = counter < duty
//!
//!   ramp  (every step_interval)  duty   += ±step, clamped to [0, resolution]
//!                                direction flips at either end
//! ```
//!
//! `resolution` ticks make one base period, so the ON fraction of each
//! period is `duty / resolution`.  The ramp traces a triangle wave:
//!
//! ```text
//!   resolution ┤    /\        /\
//!              │   /  \      /  \
//!            0 ┤__/    \____/    \__
//! ```
//!
//! The counter is owned by the tick callback and the duty level by the
//! ramp callback; the tick callback only reads the duty level.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::app::ports::{OutputLine, Rearm, TimerCallback};
use crate::fsm::Mode;
use crate::fsm::context::Shared;

// ---------------------------------------------------------------------------
// Pure waveform math
// ---------------------------------------------------------------------------

/// Ramp direction of the duty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One ramp step.  Reaching or passing either bound clamps to it and
/// reverses the direction on the same step.
pub fn ramp_step(duty: u32, direction: Direction, step: u32, resolution: u32) -> (u32, Direction) {
    match direction {
        Direction::Up => {
            if duty.saturating_add(step) >= resolution {
                (resolution, Direction::Down)
            } else {
                (duty + step, Direction::Up)
            }
        }
        Direction::Down => {
            if duty <= step {
                (0, Direction::Up)
            } else {
                (duty - step, Direction::Down)
            }
        }
    }
}

/// Next tick counter value, wrapping at `resolution`.
pub fn advance_counter(counter: u32, resolution: u32) -> u32 {
    let next = counter.saturating_add(1);
    if next >= resolution { 0 } else { next }
}

/// Output level for one tick.
pub fn render(counter: u32, duty: u32) -> bool {
    counter < duty
}

// ---------------------------------------------------------------------------
// Ramp state (written by the ramp callback)
// ---------------------------------------------------------------------------

pub struct RampState {
    duty: AtomicU32,
    falling: AtomicBool,
}

impl RampState {
    pub const fn new() -> Self {
        Self {
            duty: AtomicU32::new(0),
            falling: AtomicBool::new(false),
        }
    }

    pub fn duty(&self) -> u32 {
        self.duty.load(Ordering::Relaxed)
    }

    pub fn direction(&self) -> Direction {
        if self.falling.load(Ordering::Relaxed) { Direction::Down } else { Direction::Up }
    }

    /// Duty 0, ramping up.
    pub fn reset(&self) {
        self.duty.store(0, Ordering::Relaxed);
        self.falling.store(false, Ordering::Relaxed);
    }

    /// Apply one [`ramp_step`] and return the new duty level.
    pub fn advance(&self, step: u32, resolution: u32) -> u32 {
        let (duty, direction) = ramp_step(self.duty(), self.direction(), step, resolution);
        self.duty.store(duty, Ordering::Relaxed);
        self.falling.store(direction == Direction::Down, Ordering::Relaxed);
        duty
    }
}

impl Default for RampState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tick state (written by the tick callback)
// ---------------------------------------------------------------------------

pub struct TickState {
    counter: AtomicU32,
}

impl TickState {
    pub const fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }

    /// Apply one [`advance_counter`] and return the new counter.
    pub fn advance(&self, resolution: u32) -> u32 {
        let next = advance_counter(self.counter(), resolution);
        self.counter.store(next, Ordering::Relaxed);
        next
    }
}

impl Default for TickState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Timer callbacks
// ---------------------------------------------------------------------------

/// Fast callback: advance the counter and render the PWM line.
pub fn tick_callback<O: OutputLine + 'static>(shared: Arc<Shared<O>>) -> TimerCallback {
    Box::new(move || {
        if shared.mode.get() != Mode::Breathe {
            return Rearm::Stop;
        }
        let counter = shared.tick.advance(shared.timing.resolution);
        shared.outputs.pwm.set(render(counter, shared.ramp.duty()));
        Rearm::After(shared.timing.tick_interval)
    })
}

/// Slow callback: move the duty level one step along the triangle wave.
pub fn ramp_callback<O: OutputLine + 'static>(shared: Arc<Shared<O>>) -> TimerCallback {
    Box::new(move || {
        if shared.mode.get() != Mode::Breathe {
            return Rearm::Stop;
        }
        shared.ramp.advance(shared.timing.step, shared.timing.resolution);
        Rearm::After(shared.timing.step_interval)
    })
}
