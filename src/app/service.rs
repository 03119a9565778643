//! Controller lifecycle, the hexagonal core.
//!
//! [`Controller`] owns the acquired lines, the mode controller and the
//! interrupt registration.  All I/O flows through port traits, making the
//! whole lifecycle testable with mock adapters and virtual time.
//!
//! ```text
//!   GpioPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  TimerPort ──▶ │        Controller         │
//! InterruptPort ▶│  ModeController · Button  │
//!                └──────────────────────────┘
//! ```
//!
//! ## Startup
//!
//! 1. validate configuration
//! 2. resolve the line provider (hint, else whoever owns the lines)
//! 3. acquire led1, led2, pwm-led (outputs) and button (input)
//! 4. create the toggle, tick and ramp timers
//! 5. start Toggle
//! 6. register the button interrupt (both edges)
//!
//! Any failure unwinds the steps already taken in reverse order and is
//! returned to the caller; nothing is left running.
//!
//! ## Shutdown
//!
//! Unregister the interrupt first so no transition can race the teardown,
//! then stop both modes, drive every LED off and release the lines.
//! Each step is guarded, so shutdown is idempotent.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::drivers::button::ButtonHandler;
use crate::drivers::pwm::{ramp_callback, tick_callback};
use crate::drivers::toggle::toggle_callback;
use crate::error::{Error, LineError, Result, TimerError};
use crate::fsm::context::{ControllerStatus, Outputs, Shared};
use crate::fsm::{Mode, ModeController, ModeTimers};
use crate::pins;

use super::events::ControllerEvent;
use super::ports::{ChipId, Edge, EventSink, GpioPort, InterruptPort, LineId, OutputLine, TimerPort};

// ───────────────────────────────────────────────────────────────
// Line assignment
// ───────────────────────────────────────────────────────────────

/// The four lines in acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineIds {
    pub led_a: LineId,
    pub led_b: LineId,
    pub pwm: LineId,
    pub button: LineId,
}

impl From<&ControllerConfig> for LineIds {
    fn from(c: &ControllerConfig) -> Self {
        Self {
            led_a: c.led1_line,
            led_b: c.led2_line,
            pwm: c.pwm_line,
            button: c.button_line,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// A running controller.  Only exists after a successful startup.
pub struct Controller<G, T, I, S>
where
    G: GpioPort,
    T: TimerPort,
    I: InterruptPort,
    S: EventSink + 'static,
{
    gpio: G,
    irq: I,
    modes: Arc<ModeController<G::Output, T::Timer>>,
    button: Arc<G::Input>,
    registration: Option<I::Registration>,
    lines: LineIds,
    lines_held: bool,
    sink: Arc<S>,
}

impl<G, T, I, S> Controller<G, T, I, S>
where
    G: GpioPort,
    T: TimerPort,
    I: InterruptPort,
    S: EventSink + 'static,
{
    // ── Lifecycle ─────────────────────────────────────────────

    /// Acquire everything, start Toggle and arm the button interrupt.
    ///
    /// `timers` must outlive the returned controller.
    pub fn start(config: &ControllerConfig, mut gpio: G, timers: &T, mut irq: I, sink: Arc<S>) -> Result<Self> {
        let timing = config.validate();
        let lines = LineIds::from(config);

        let chip = resolve_chip(&gpio, config.provider_hint(), lines.led_a, &*sink)?;
        let (outputs, button) = acquire_lines(&mut gpio, chip, &lines)?;
        let shared = Arc::new(Shared::new(timing, outputs));
        let button = Arc::new(button);

        let mode_timers = match create_timers(timers, &shared) {
            Ok(t) => t,
            Err(e) => {
                error!("timer: {}, releasing lines", e);
                release_lines(&mut gpio, &shared.outputs, &button);
                return Err(e.into());
            }
        };

        let modes = Arc::new(ModeController::new(shared, mode_timers));
        modes.start(Mode::Toggle);

        let handler = ButtonHandler::new(Arc::clone(&button), Arc::clone(&modes), Arc::clone(&sink));
        let registration = match irq.register(
            lines.button,
            Edge::Both,
            pins::BUTTON_CONSUMER,
            handler.into_irq_handler(),
        ) {
            Ok(r) => r,
            Err(cause) => {
                error!("irq: failed to register button line {}: {}", lines.button, cause);
                modes.stop_all();
                release_lines(&mut gpio, &modes.shared().outputs, &button);
                return Err(Error::InterruptRegistrationFailed {
                    line: lines.button,
                    cause,
                });
            }
        };

        info!(
            "started (LEDs {}/{}, PWM {}, button {})",
            lines.led_a, lines.led_b, lines.pwm, lines.button
        );
        sink.emit(&ControllerEvent::Started {
            led_a: lines.led_a,
            led_b: lines.led_b,
            pwm: lines.pwm,
            button: lines.button,
        });

        Ok(Self {
            gpio,
            irq,
            modes,
            button,
            registration: Some(registration),
            lines,
            lines_held: true,
            sink,
        })
    }

    /// Tear down in the order interrupt → modes → lines.  Safe to call twice.
    pub fn shutdown(&mut self) {
        if let Some(registration) = self.registration.take() {
            self.irq.unregister(registration);
        }
        if !self.lines_held {
            return;
        }

        self.modes.stop_all();
        release_lines(&mut self.gpio, &self.modes.shared().outputs, &self.button);
        self.lines_held = false;

        self.sink.emit(&ControllerEvent::Stopped);
        info!("controller unloaded");
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn status(&self) -> ControllerStatus {
        self.modes.status()
    }

    pub fn lines(&self) -> LineIds {
        self.lines
    }

    pub fn is_running(&self) -> bool {
        self.lines_held
    }
}

impl<G, T, I, S> Drop for Controller<G, T, I, S>
where
    G: GpioPort,
    T: TimerPort,
    I: InterruptPort,
    S: EventSink + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ───────────────────────────────────────────────────────────────
// Startup steps
// ───────────────────────────────────────────────────────────────

/// Pick the provider for all four lines: the hinted one if it exists,
/// else the one owning `line`.
fn resolve_chip<G: GpioPort>(
    gpio: &G,
    hint: Option<&str>,
    line: LineId,
    sink: &impl EventSink,
) -> Result<ChipId> {
    if let Some(chip) = hint.and_then(|label| gpio.find_chip_by_label(label)) {
        return Ok(chip);
    }

    let Some(chip) = gpio.find_chip_for_line(line) else {
        error!("gpio: no line provider owns line {}", line);
        return Err(Error::ResourceUnavailable {
            line,
            cause: LineError::NoProvider,
        });
    };

    if let Some(label) = hint {
        warn!(
            "gpio: provider '{}' not found, using '{}' which owns line {}",
            label,
            gpio.chip_label(chip),
            line
        );
        sink.emit(&ControllerEvent::ProviderFallback);
    }
    Ok(chip)
}

fn request_output<G: GpioPort>(
    gpio: &mut G,
    chip: ChipId,
    line: LineId,
    consumer: &'static str,
    initial: bool,
) -> Result<G::Output> {
    gpio.request_output(chip, line, consumer, initial).map_err(|cause| {
        error!("gpio: failed to request line {} ({}): {}", line, consumer, cause);
        Error::from_line(line, cause)
    })
}

/// Acquire all four lines, releasing the ones already held on failure.
fn acquire_lines<G: GpioPort>(gpio: &mut G, chip: ChipId, lines: &LineIds) -> Result<(Outputs<G::Output>, G::Input)> {
    let led_a = request_output(gpio, chip, lines.led_a, pins::LED_A_CONSUMER, true)?;

    let led_b = match request_output(gpio, chip, lines.led_b, pins::LED_B_CONSUMER, false) {
        Ok(l) => l,
        Err(e) => {
            rollback(gpio, &[&led_a]);
            return Err(e);
        }
    };

    let pwm = match request_output(gpio, chip, lines.pwm, pins::PWM_CONSUMER, false) {
        Ok(l) => l,
        Err(e) => {
            rollback(gpio, &[&led_b, &led_a]);
            return Err(e);
        }
    };

    let button = match gpio.request_input(chip, lines.button, pins::BUTTON_CONSUMER) {
        Ok(b) => b,
        Err(cause) => {
            error!("gpio: failed to request button line {}: {}", lines.button, cause);
            rollback(gpio, &[&pwm, &led_b, &led_a]);
            return Err(Error::from_line(lines.button, cause));
        }
    };

    Ok((Outputs { led_a, led_b, pwm }, button))
}

/// Release outputs in the given (reverse-acquisition) order.
fn rollback<G: GpioPort>(gpio: &mut G, acquired: &[&G::Output]) {
    for line in acquired {
        gpio.release_output(line);
    }
    debug!("gpio: rolled back {} line(s)", acquired.len());
}

/// Drive outputs off and release all four lines, newest first.
fn release_lines<G: GpioPort>(gpio: &mut G, outputs: &Outputs<G::Output>, button: &G::Input) {
    outputs.all_off();
    gpio.release_input(button);
    rollback(gpio, &[&outputs.pwm, &outputs.led_b, &outputs.led_a]);
}

fn create_timers<T, O>(timers: &T, shared: &Arc<Shared<O>>) -> core::result::Result<ModeTimers<T::Timer>, TimerError>
where
    T: TimerPort,
    O: OutputLine + 'static,
{
    Ok(ModeTimers {
        toggle: timers.create("toggle", toggle_callback(Arc::clone(shared)))?,
        tick: timers.create("pwm-tick", tick_callback(Arc::clone(shared)))?,
        ramp: timers.create("pwm-ramp", ramp_callback(Arc::clone(shared)))?,
    })
}
