//! breathctl: software-PWM LED controller.
//!
//! Two LEDs alternate in toggle mode; a third breathes through a
//! software-PWM triangle ramp.  A button interrupt cycles between the two.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; the host build runs on simulated lines.
//!
//! ESP32 builds need `--features espidf`, which pulls in the ESP-IDF
//! bindings and the `embuild` build step.

#![deny(unused_must_use)]

#[cfg(all(target_os = "espidf", not(feature = "espidf")))]
compile_error!("building for ESP-IDF requires the `espidf` feature of crate breathctl");

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod pins;

pub use app::service::Controller;
pub use config::ControllerConfig;
pub use error::{Error, Result};
pub use fsm::Mode;
