//! Unified error types for the controller.
//!
//! A single `Error` enum that every port error converts into, so startup
//! can report any failure uniformly and unwind.  All variants are `Copy`
//! so they can be passed through the rollback path without allocation.
//!
//! Every startup error is fatal: no retry, every acquired line is released
//! in reverse order, and no mode is left running.  There are no
//! recoverable runtime errors; a spurious edge is observed and discarded.

use core::fmt;

use crate::app::ports::LineId;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible startup operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No line provider owns the requested line, or the line does not exist.
    ResourceUnavailable { line: LineId, cause: LineError },
    /// The provider owns the line but refused to hand it out.
    AcquisitionFailed { line: LineId, cause: LineError },
    /// The edge interrupt for the button line could not be registered.
    InterruptRegistrationFailed { line: LineId, cause: IrqError },
    /// A timer could not be created.
    Timer(TimerError),
    /// Configuration could not be loaded.
    Config(&'static str),
}

impl Error {
    /// Classify a provider error for `line` into the startup taxonomy.
    pub fn from_line(line: LineId, cause: LineError) -> Self {
        match cause {
            LineError::NoProvider | LineError::NotOwned => Self::ResourceUnavailable { line, cause },
            LineError::Busy | LineError::Io(_) => Self::AcquisitionFailed { line, cause },
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceUnavailable { line, cause } => {
                write!(f, "line {line} unavailable: {cause}")
            }
            Self::AcquisitionFailed { line, cause } => {
                write!(f, "failed to acquire line {line}: {cause}")
            }
            Self::InterruptRegistrationFailed { line, cause } => {
                write!(f, "failed to register interrupt for line {line}: {cause}")
            }
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Line provider errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// No provider matched the hint and none owns the line.
    NoProvider,
    /// The chosen provider does not own this line number.
    NotOwned,
    /// Another consumer already holds the line.
    Busy,
    /// Driver-level failure with the platform's return code.
    Io(i32),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProvider => write!(f, "no line provider owns it"),
            Self::NotOwned => write!(f, "outside the provider's range"),
            Self::Busy => write!(f, "already in use"),
            Self::Io(rc) => write!(f, "driver error (rc={rc})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The timer service refused to create another timer.
    CreateFailed(i32),
    /// The timer service has been shut down.
    ServiceStopped,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateFailed(rc) => write!(f, "create failed (rc={rc})"),
            Self::ServiceStopped => write!(f, "timer service stopped"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Interrupt errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqError {
    /// The line cannot be mapped to an interrupt.
    NoIrq,
    /// The line already has a handler.
    AlreadyRegistered,
    /// The deferred handler thread could not be spawned.
    SpawnFailed,
    /// Platform-level failure with its return code.
    Io(i32),
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoIrq => write!(f, "line has no interrupt"),
            Self::AlreadyRegistered => write!(f, "handler already registered"),
            Self::SpawnFailed => write!(f, "handler thread spawn failed"),
            Self::Io(rc) => write!(f, "platform error (rc={rc})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
