//! `embedded-hal` bridge for line handles.
//!
//! Wraps any `embedded_hal::digital::{OutputPin, InputPin}` so it can be
//! shared between the timer context and the mode controller.  The pin
//! sits behind a critical-section mutex; `release` takes it out, after
//! which `set` is ignored and `is_high` reports an I/O error.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::app::ports::{InputLine, LineId, OutputLine};
use crate::error::LineError;

/// Return code reported when a HAL read fails or the pin was released.
const EIO: i32 = -5;

// ── Output ────────────────────────────────────────────────────

pub struct HalOutput<P> {
    line: LineId,
    pin: CriticalSectionMutex<RefCell<Option<P>>>,
}

impl<P> HalOutput<P> {
    pub fn new(line: LineId, pin: P) -> Self {
        Self {
            line,
            pin: CriticalSectionMutex::new(RefCell::new(Some(pin))),
        }
    }

    pub fn line(&self) -> LineId {
        self.line
    }

    /// Take the pin back out.  `None` if already released.
    pub fn release(&self) -> Option<P> {
        self.pin.lock(|cell| cell.borrow_mut().take())
    }

    pub fn is_released(&self) -> bool {
        self.pin.lock(|cell| cell.borrow().is_none())
    }
}

impl<P: OutputPin + Send> OutputLine for HalOutput<P> {
    fn set(&self, on: bool) {
        self.pin.lock(|cell| {
            if let Some(pin) = cell.borrow_mut().as_mut() {
                // Callers run in timer context and cannot report this.
                let _ = pin.set_state(PinState::from(on));
            }
        });
    }
}

// ── Input ─────────────────────────────────────────────────────

pub struct HalInput<P> {
    line: LineId,
    pin: CriticalSectionMutex<RefCell<Option<P>>>,
}

impl<P> HalInput<P> {
    pub fn new(line: LineId, pin: P) -> Self {
        Self {
            line,
            pin: CriticalSectionMutex::new(RefCell::new(Some(pin))),
        }
    }

    pub fn line(&self) -> LineId {
        self.line
    }

    pub fn release(&self) -> Option<P> {
        self.pin.lock(|cell| cell.borrow_mut().take())
    }
}

impl<P: InputPin + Send> InputLine for HalInput<P> {
    fn is_high(&self) -> Result<bool, LineError> {
        self.pin.lock(|cell| match cell.borrow_mut().as_mut() {
            Some(pin) => pin.is_high().map_err(|_| LineError::Io(EIO)),
            None => Err(LineError::Io(EIO)),
        })
    }
}
