//! Controller configuration parameters
//!
//! Startup-time parameters for the line assignments and the animation
//! timing.  Values come from [`ControllerConfig::default`] (the reference
//! board) or a JSON document, and are read exactly once: [`validate`]
//! turns them into an immutable [`Timing`] that the engines copy.
//!
//! Units: toggle period and step interval in milliseconds, PWM base
//! period in microseconds.  The JSON keys also accept the unit-less
//! names `toggle_period`, `pwm_base_period` and `pwm_step_interval`.
//!
//! [`validate`]: ControllerConfig::validate

use core::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::LineId;
use crate::error::{Error, Result};
use crate::pins;

/// Capacity of the provider-name hint.
pub const PROVIDER_NAME_LEN: usize = 32;

/// Zero toggle period is coerced to this many milliseconds.
pub const MIN_TOGGLE_PERIOD_MS: u32 = 1;
/// Zero PWM base period is coerced to this many microseconds.
pub const MIN_PWM_BASE_PERIOD_US: u64 = 1;
/// Zero resolution is coerced to this many steps.
pub const MIN_PWM_RESOLUTION: u32 = 1;
/// Zero ramp step is coerced to this.
pub const MIN_PWM_STEP: u32 = 1;
/// Zero step interval is coerced to this many milliseconds.
pub const FALLBACK_STEP_INTERVAL_MS: u32 = 10;
/// Lower bound for the derived tick interval.
pub const TICK_INTERVAL_FLOOR: Duration = Duration::from_micros(1);

/// Startup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Lines ---
    /// First LED of the toggle pair
    pub led1_line: LineId,
    /// Second LED of the toggle pair
    pub led2_line: LineId,
    /// LED driven by software PWM
    pub pwm_line: LineId,
    /// Button input (interrupt source)
    pub button_line: LineId,

    // --- Toggle ---
    /// Half-period of the alternating blink (milliseconds)
    #[serde(alias = "toggle_period")]
    pub toggle_period_ms: u32,

    // --- PWM ---
    /// Length of one PWM period (microseconds)
    #[serde(alias = "pwm_base_period")]
    pub pwm_base_period_us: u64,
    /// Ticks per PWM period; also the maximum duty level
    pub pwm_resolution: u32,
    /// Duty change per ramp step
    pub pwm_step: u32,
    /// Time between ramp steps (milliseconds)
    #[serde(alias = "pwm_step_interval")]
    pub pwm_step_interval_ms: u32,

    // --- Provider ---
    /// Preferred line provider label; empty means "scan"
    pub line_provider_name: heapless::String<PROVIDER_NAME_LEN>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let mut line_provider_name = heapless::String::new();
        // Fits: the label is shorter than PROVIDER_NAME_LEN.
        let _ = line_provider_name.push_str(pins::PROVIDER_LABEL);

        Self {
            led1_line: pins::LED_A_LINE,
            led2_line: pins::LED_B_LINE,
            pwm_line: pins::PWM_LINE,
            button_line: pins::BUTTON_LINE,

            toggle_period_ms: 1000, // 0.5 Hz blink

            pwm_base_period_us: 20_000, // 50 Hz PWM
            pwm_resolution: 100,
            pwm_step: 2,
            pwm_step_interval_ms: 40, // full breath ≈ 4 s

            line_provider_name,
        }
    }
}

/// Validated, immutable timing derived from [`ControllerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub toggle_period: Duration,
    pub pwm_base_period: Duration,
    pub resolution: u32,
    pub step: u32,
    pub step_interval: Duration,
    /// `pwm_base_period / resolution`, never below [`TICK_INTERVAL_FLOOR`].
    pub tick_interval: Duration,
}

impl ControllerConfig {
    /// Parse a JSON document.  Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|_| Error::Config("malformed JSON"))
    }

    /// The provider hint, or `None` when empty.
    pub fn provider_hint(&self) -> Option<&str> {
        let name = self.line_provider_name.as_str();
        (!name.is_empty()).then_some(name)
    }

    /// Coerce zero values up to their minimum and derive the tick interval.
    ///
    /// Never fails: every out-of-range value has a documented replacement,
    /// and each replacement is logged.
    pub fn validate(&self) -> Timing {
        let toggle_ms = at_least("toggle_period_ms", self.toggle_period_ms, MIN_TOGGLE_PERIOD_MS);
        let base_us = at_least("pwm_base_period_us", self.pwm_base_period_us, MIN_PWM_BASE_PERIOD_US);
        let resolution = at_least("pwm_resolution", self.pwm_resolution, MIN_PWM_RESOLUTION);
        let step = at_least("pwm_step", self.pwm_step, MIN_PWM_STEP);
        let step_ms = at_least("pwm_step_interval_ms", self.pwm_step_interval_ms, FALLBACK_STEP_INTERVAL_MS);

        Timing {
            toggle_period: Duration::from_millis(u64::from(toggle_ms)),
            pwm_base_period: Duration::from_micros(base_us),
            resolution,
            step,
            step_interval: Duration::from_millis(u64::from(step_ms)),
            tick_interval: tick_interval(base_us, resolution),
        }
    }
}

/// `base_us / resolution`, clamped up to [`TICK_INTERVAL_FLOOR`].
///
/// Computed in nanoseconds so resolutions finer than 1 µs per tick only
/// lose precision at the floor.
pub fn tick_interval(base_us: u64, resolution: u32) -> Duration {
    let base_ns = base_us.saturating_mul(1_000);
    let tick = Duration::from_nanos(base_ns / u64::from(resolution.max(1)));
    tick.max(TICK_INTERVAL_FLOOR)
}

fn at_least<T>(name: &str, value: T, replacement: T) -> T
where
    T: Copy + PartialEq + Default + core::fmt::Display,
{
    if value == T::default() {
        warn!("config: {name} is 0, using {replacement}");
        replacement
    } else {
        value
    }
}
