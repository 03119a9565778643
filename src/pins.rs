//! Default line assignments for the reference board.
//!
//! Single source of truth for the out-of-the-box wiring.  Every value can
//! be overridden through [`ControllerConfig`](crate::config::ControllerConfig).

use crate::app::ports::LineId;

// ---------------------------------------------------------------------------
// Toggle pair (alternating blink)
// ---------------------------------------------------------------------------

/// First LED of the toggle pair; starts lit.
pub const LED_A_LINE: LineId = 17;
/// Second LED of the toggle pair; starts dark.
pub const LED_B_LINE: LineId = 19;

// ---------------------------------------------------------------------------
// Software PWM output
// ---------------------------------------------------------------------------

/// LED driven by the breathing waveform.
pub const PWM_LINE: LineId = 18;

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

/// Momentary switch, active high.  Both edges raise the interrupt.
pub const BUTTON_LINE: LineId = 27;

// ---------------------------------------------------------------------------
// Line provider
// ---------------------------------------------------------------------------

/// Label of the pin controller that owns the lines above.
pub const PROVIDER_LABEL: &str = "pinctrl-bcm2711";

/// Consumer labels reported to the provider when requesting lines.
pub const LED_A_CONSUMER: &str = "led1";
pub const LED_B_CONSUMER: &str = "led2";
pub const PWM_CONSUMER: &str = "pwm-led";
pub const BUTTON_CONSUMER: &str = "button";
