//! Application core: mode lifecycle, zero platform I/O.
//!
//! All interaction with lines, timers and interrupts happens through the
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! with mock adapters and virtual time.

pub mod events;
pub mod ports;
pub mod service;
