//! Shared state threaded through the timer callbacks and the mode controller.
//!
//! Every mode-local variable has exactly one writer while its mode runs:
//!
//! | Field          | Writer while running | Reset by            |
//! |----------------|----------------------|---------------------|
//! | `toggle`       | toggle callback      | start/stop Toggle   |
//! | `ramp`         | ramp callback        | start/stop Breathe  |
//! | `tick`         | tick callback        | start/stop Breathe  |
//! | `mode`         | mode controller      | never               |
//!
//! Resets only happen after cancel-and-wait, so a reset never races the
//! callback that owns the field.  The tick callback reads `ramp.duty()`
//! but never writes it; the two are combined only when rendering.

use super::{Mode, ModeCell};
use crate::app::ports::OutputLine;
use crate::config::Timing;
use crate::drivers::pwm::{Direction, RampState, TickState};
use crate::drivers::toggle::TogglePhase;

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// The three driven lines.
pub struct Outputs<O> {
    /// Toggle pair, first LED.
    pub led_a: O,
    /// Toggle pair, second LED.
    pub led_b: O,
    /// Software-PWM LED.
    pub pwm: O,
}

impl<O: OutputLine> Outputs<O> {
    pub fn all_off(&self) {
        self.led_a.set(false);
        self.led_b.set(false);
        self.pwm.set(false);
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct Shared<O> {
    pub mode: ModeCell,
    pub timing: Timing,
    pub toggle: TogglePhase,
    pub ramp: RampState,
    pub tick: TickState,
    pub outputs: Outputs<O>,
}

impl<O> Shared<O> {
    /// Fresh state in Idle.  Outputs keep whatever level they were acquired with.
    pub fn new(timing: Timing, outputs: Outputs<O>) -> Self {
        Self {
            mode: ModeCell::new(Mode::Idle),
            timing,
            toggle: TogglePhase::new(),
            ramp: RampState::new(),
            tick: TickState::new(),
            outputs,
        }
    }
}

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of the controller, for logs and tests.
///
/// Fields are sampled individually, so a snapshot taken while Breathe runs
/// may mix values from adjacent ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    pub mode: Mode,
    /// `true` while LED A is the lit one of the toggle pair.
    pub led_a_lit: bool,
    pub duty: u32,
    pub direction: Direction,
    pub counter: u32,
    /// Button-driven transitions since startup.
    pub transitions: u32,
}
