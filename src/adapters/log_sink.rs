//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events through the
//! `log` facade (ESP-IDF console on target, tracing-subscriber on host).

use log::{debug, info};

use crate::app::events::ControllerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ControllerEvent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &ControllerEvent) {
        match event {
            ControllerEvent::Started { led_a, led_b, pwm, button } => {
                info!("START | leds={}/{} pwm={} button={}", led_a, led_b, pwm, button);
            }
            ControllerEvent::ProviderFallback => {
                info!("GPIO  | hinted provider missing, fell back to owner scan");
            }
            ControllerEvent::ModeChanged { from, to } => {
                info!("MODE  | {:?} -> {:?}", from, to);
            }
            ControllerEvent::SpuriousEdge => {
                debug!("EDGE  | spurious, discarded");
            }
            ControllerEvent::Stopped => {
                info!("STOP  | all lines released");
            }
        }
    }
}
