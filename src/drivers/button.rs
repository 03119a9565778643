//! Button event handler (deferred interrupt context).
//!
//! ## Hardware
//!
//! Momentary switch, active high.  The interrupt fires on both edges and
//! the handler runs in the interrupt layer's threaded context, so it may
//! block: it samples the line, and on a press asks the
//! [`ModeController`] to cycle.
//!
//! | Line level | Action                                   |
//! |------------|------------------------------------------|
//! | high       | Toggle → Breathe, Breathe/Idle → Toggle  |
//! | low        | discarded (release edge or bounce)       |
//! | read error | discarded                                |
//!
//! No debouncing beyond edge triggering: every qualifying edge is exactly
//! one transition.

use std::sync::Arc;

use log::{debug, info};

use crate::app::events::ControllerEvent;
use crate::app::ports::{EventSink, InputLine, IrqHandler, OutputLine, TimerHandle};
use crate::fsm::{Mode, ModeController};

pub struct ButtonHandler<I, O, T, S> {
    input: Arc<I>,
    modes: Arc<ModeController<O, T>>,
    sink: Arc<S>,
}

impl<I, O, T, S> ButtonHandler<I, O, T, S>
where
    I: InputLine + 'static,
    O: OutputLine + 'static,
    T: TimerHandle + 'static,
    S: EventSink + 'static,
{
    pub fn new(input: Arc<I>, modes: Arc<ModeController<O, T>>, sink: Arc<S>) -> Self {
        Self { input, modes, sink }
    }

    /// Handle one edge.  Returns the transition taken, if any.
    pub fn on_edge(&self) -> Option<(Mode, Mode)> {
        match self.input.is_high() {
            Ok(true) => {}
            Ok(false) => {
                debug!("button: edge while released, ignored");
                self.sink.emit(&ControllerEvent::SpuriousEdge);
                return None;
            }
            Err(e) => {
                debug!("button: read failed ({}), edge ignored", e);
                self.sink.emit(&ControllerEvent::SpuriousEdge);
                return None;
            }
        }

        let (from, to) = self.modes.cycle();
        match (from, to) {
            (Mode::Toggle, Mode::Breathe) => info!("button: breathing started"),
            (Mode::Breathe, Mode::Toggle) => info!("button: toggle animation resumed"),
            _ => info!("button: toggle animation started"),
        }
        self.sink.emit(&ControllerEvent::ModeChanged { from, to });
        Some((from, to))
    }

    /// Box the handler for [`InterruptPort::register`](crate::app::ports::InterruptPort::register).
    pub fn into_irq_handler(self) -> IrqHandler {
        Box::new(move || {
            let _ = self.on_edge();
        })
    }
}
