//! Port traits: the hexagonal boundary between the mode logic and the platform.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller / ModeController (domain)
//! ```
//!
//! Three external collaborators are modelled here: the line provider
//! ([`GpioPort`]), the high-resolution timer service ([`TimerPort`]) and
//! the threaded interrupt layer ([`InterruptPort`]).  Host simulations,
//! ESP-IDF drivers and test mocks all implement the same traits, so the
//! domain never touches hardware directly.
//!
//! ## Context rules
//!
//! - [`OutputLine::set`] is called from timer callbacks and must not block.
//! - [`InputLine::is_high`] is only called from the deferred interrupt
//!   handler and may block.
//! - Timer callbacks run in a non-blocking context; they only re-arm or stop.

use core::time::Duration;

use crate::error::{IrqError, LineError, TimerError};

/// Stable identifier of a line (global GPIO number).
pub type LineId = u32;

/// Index of a line provider (pin controller / GPIO chip) within a [`GpioPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChipId(pub usize);

// ───────────────────────────────────────────────────────────────
// Line handles
// ───────────────────────────────────────────────────────────────

/// An acquired output line.
///
/// Shared between timer callbacks and the mode controller, hence `&self`.
pub trait OutputLine: Send + Sync {
    /// Drive the line.  `true` = ON (high).
    fn set(&self, on: bool);
}

/// An acquired input line.
pub trait InputLine: Send + Sync {
    /// Sample the line level.  May block.
    fn is_high(&self) -> Result<bool, LineError>;
}

// ───────────────────────────────────────────────────────────────
// Line provider port
// ───────────────────────────────────────────────────────────────

/// Acquires and releases lines from the platform's line providers.
pub trait GpioPort {
    type Output: OutputLine + 'static;
    type Input: InputLine + 'static;

    /// Provider whose label equals `label`, if any.
    fn find_chip_by_label(&self, label: &str) -> Option<ChipId>;

    /// Provider whose range contains `line`, if any.
    fn find_chip_for_line(&self, line: LineId) -> Option<ChipId>;

    /// Label of a provider returned by one of the lookups above.
    fn chip_label(&self, chip: ChipId) -> &str;

    /// Claim `line` as an output driven to `initial`.
    fn request_output(
        &mut self,
        chip: ChipId,
        line: LineId,
        consumer: &'static str,
        initial: bool,
    ) -> Result<Self::Output, LineError>;

    /// Claim `line` as an input.
    fn request_input(
        &mut self,
        chip: ChipId,
        line: LineId,
        consumer: &'static str,
    ) -> Result<Self::Input, LineError>;

    /// Give an output back to its provider.  Later `set` calls are ignored.
    fn release_output(&mut self, line: &Self::Output);

    /// Give an input back to its provider.
    fn release_input(&mut self, line: &Self::Input);
}

// ───────────────────────────────────────────────────────────────
// Timer service port
// ───────────────────────────────────────────────────────────────

/// What a timer callback asks for when it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rearm {
    /// Do not fire again until restarted.
    Stop,
    /// Fire again this long after the *scheduled* time of the firing that
    /// just ran, so periodic timers do not drift by callback latency.
    After(Duration),
}

/// Next deadline of a periodic timer whose firing at `scheduled` just ran.
///
/// Normally `scheduled + period`.  If the dispatcher fell behind so that
/// deadline has already passed, skip whole periods to the first one after
/// `now` instead of firing a burst.
pub fn next_deadline(scheduled: Duration, period: Duration, now: Duration) -> Duration {
    let next = scheduled + period;
    if next > now || period.is_zero() {
        return next;
    }
    let missed = (now - next).as_nanos() / period.as_nanos() + 1;
    let skip = period.as_nanos().saturating_mul(missed);
    next + Duration::from_nanos(u64::try_from(skip).unwrap_or(u64::MAX))
}

/// Callback run by the timer service.  Must not block.
pub type TimerCallback = Box<dyn FnMut() -> Rearm + Send + 'static>;

/// A one-shot, self-re-arming timer.
pub trait TimerHandle: Send + Sync {
    /// Arm the timer to fire `delay` from now, replacing any pending expiry.
    fn start(&self, delay: Duration);

    /// Disarm the timer and wait until any in-flight callback has returned.
    ///
    /// Returns `true` if the timer was pending or running.
    fn cancel(&self) -> bool;
}

/// Creates timers bound to a callback.
pub trait TimerPort {
    type Timer: TimerHandle + 'static;

    fn create(&self, name: &'static str, callback: TimerCallback) -> Result<Self::Timer, TimerError>;
}

// ───────────────────────────────────────────────────────────────
// Interrupt port
// ───────────────────────────────────────────────────────────────

/// Which transitions of the input raise the interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

impl Edge {
    /// Whether a change to `new_level` raises this interrupt.
    pub fn accepts(self, new_level: bool) -> bool {
        match self {
            Self::Rising => new_level,
            Self::Falling => !new_level,
            Self::Both => true,
        }
    }
}

/// Deferred (threaded) handler.  Runs in a context that may block, and
/// never concurrently with itself for the same registration.
pub type IrqHandler = Box<dyn FnMut() + Send + 'static>;

/// Registers deferred edge handlers on input lines.
pub trait InterruptPort {
    type Registration;

    fn register(
        &mut self,
        line: LineId,
        edge: Edge,
        name: &'static str,
        handler: IrqHandler,
    ) -> Result<Self::Registration, IrqError>;

    /// Remove the handler, waiting for a running invocation to return.
    fn unregister(&mut self, registration: Self::Registration);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`ControllerEvent`](super::events::ControllerEvent)s
/// through this port.  Shared with the interrupt context, hence `&self`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::ControllerEvent);
}
