//! Structured events emitted by the controller.
//!
//! Adapters implementing [`EventSink`](super::ports::EventSink) decide
//! where these go (serial log, test recorder, ...).

use crate::app::ports::LineId;
use crate::fsm::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Startup completed; Toggle is running.
    Started {
        led_a: LineId,
        led_b: LineId,
        pwm: LineId,
        button: LineId,
    },
    /// The hinted provider was missing; another one owns the lines.
    ProviderFallback,
    /// A button press moved the controller between modes.
    ModeChanged { from: Mode, to: Mode },
    /// An edge fired while the button read "not pressed".
    SpuriousEdge,
    /// Shutdown completed; all lines released.
    Stopped,
}
