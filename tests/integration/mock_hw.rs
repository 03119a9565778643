//! Mock adapters for integration tests.
//!
//! Every line request, release, level change and interrupt
//! (un)registration lands in one shared call log, so tests can assert on
//! the exact ordering of startup, rollback and shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use breathctl::adapters::sim::VirtualTimers;
use breathctl::adapters::sim::virtual_timer::VirtualTimer;
use breathctl::app::events::ControllerEvent;
use breathctl::app::ports::{
    ChipId, Edge, EventSink, GpioPort, InputLine, InterruptPort, IrqHandler, LineId, OutputLine, TimerCallback,
    TimerPort,
};
use breathctl::error::{IrqError, LineError, TimerError};

// ── Call log ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    RequestOutput { line: LineId, consumer: &'static str, initial: bool },
    RequestInput { line: LineId, consumer: &'static str },
    ReleaseOutput(LineId),
    ReleaseInput(LineId),
    Set { line: LineId, on: bool },
    Register { line: LineId, edge: Edge },
    Unregister(LineId),
}

#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    button_level: Mutex<Option<Result<bool, LineError>>>,
}

#[allow(dead_code)]
impl Recorder {
    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than level changes.
    pub fn lifecycle(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| !matches!(c, Call::Set { .. })).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Current level of `line`: last `Set`, else the request's initial level.
    pub fn level(&self, line: LineId) -> bool {
        self.calls()
            .iter()
            .rev()
            .find_map(|c| match *c {
                Call::Set { line: l, on } if l == line => Some(on),
                Call::RequestOutput { line: l, initial, .. } if l == line => Some(initial),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Levels written to `line`, in order.
    pub fn history(&self, line: LineId) -> Vec<bool> {
        self.calls()
            .iter()
            .filter_map(|c| match *c {
                Call::Set { line: l, on } if l == line => Some(on),
                _ => None,
            })
            .collect()
    }

    /// What the button input reads.  Defaults to pressed.
    pub fn set_button(&self, level: Result<bool, LineError>) {
        *self.button_level.lock().unwrap() = Some(level);
    }

    fn button(&self) -> Result<bool, LineError> {
        self.button_level.lock().unwrap().unwrap_or(Ok(true))
    }
}

// ── Lines ─────────────────────────────────────────────────────

pub struct MockOutput {
    line: LineId,
    rec: Arc<Recorder>,
    released: AtomicBool,
}

impl OutputLine for MockOutput {
    fn set(&self, on: bool) {
        if !self.released.load(Ordering::Acquire) {
            self.rec.push(Call::Set { line: self.line, on });
        }
    }
}

pub struct MockInput {
    line: LineId,
    rec: Arc<Recorder>,
    released: AtomicBool,
}

impl InputLine for MockInput {
    fn is_high(&self) -> Result<bool, LineError> {
        self.rec.button()
    }
}

// ── MockGpio ──────────────────────────────────────────────────

pub struct MockGpio {
    chips: Vec<(&'static str, LineId, u32)>,
    rec: Arc<Recorder>,
    failures: HashMap<LineId, LineError>,
}

#[allow(dead_code)]
impl MockGpio {
    /// One provider labelled `pinctrl-bcm2711` owning lines 0..58.
    pub fn new(rec: Arc<Recorder>) -> Self {
        Self {
            chips: vec![("pinctrl-bcm2711", 0, 58)],
            rec,
            failures: HashMap::new(),
        }
    }

    pub fn with_chips(rec: Arc<Recorder>, chips: Vec<(&'static str, LineId, u32)>) -> Self {
        Self {
            chips,
            rec,
            failures: HashMap::new(),
        }
    }

    pub fn fail_line(mut self, line: LineId, error: LineError) -> Self {
        self.failures.insert(line, error);
        self
    }

    fn check(&self, line: LineId) -> Result<(), LineError> {
        self.failures.get(&line).map_or(Ok(()), |e| Err(*e))
    }
}

impl GpioPort for MockGpio {
    type Output = MockOutput;
    type Input = MockInput;

    fn find_chip_by_label(&self, label: &str) -> Option<ChipId> {
        self.chips.iter().position(|(l, _, _)| *l == label).map(ChipId)
    }

    fn find_chip_for_line(&self, line: LineId) -> Option<ChipId> {
        self.chips
            .iter()
            .position(|(_, base, n)| line >= *base && line - *base < *n)
            .map(ChipId)
    }

    fn chip_label(&self, chip: ChipId) -> &str {
        self.chips[chip.0].0
    }

    fn request_output(
        &mut self,
        _chip: ChipId,
        line: LineId,
        consumer: &'static str,
        initial: bool,
    ) -> Result<MockOutput, LineError> {
        self.check(line)?;
        self.rec.push(Call::RequestOutput { line, consumer, initial });
        Ok(MockOutput {
            line,
            rec: Arc::clone(&self.rec),
            released: AtomicBool::new(false),
        })
    }

    fn request_input(&mut self, _chip: ChipId, line: LineId, consumer: &'static str) -> Result<MockInput, LineError> {
        self.check(line)?;
        self.rec.push(Call::RequestInput { line, consumer });
        Ok(MockInput {
            line,
            rec: Arc::clone(&self.rec),
            released: AtomicBool::new(false),
        })
    }

    fn release_output(&mut self, line: &MockOutput) {
        if !line.released.swap(true, Ordering::AcqRel) {
            self.rec.push(Call::ReleaseOutput(line.line));
        }
    }

    fn release_input(&mut self, line: &MockInput) {
        if !line.released.swap(true, Ordering::AcqRel) {
            self.rec.push(Call::ReleaseInput(line.line));
        }
    }
}

// ── MockIrq ───────────────────────────────────────────────────

/// Interrupt layer whose edges are raised by calling [`MockIrq::fire`].
#[derive(Clone)]
pub struct MockIrq {
    rec: Arc<Recorder>,
    handler: Arc<Mutex<Option<IrqHandler>>>,
    fail: Option<IrqError>,
}

#[allow(dead_code)]
impl MockIrq {
    pub fn new(rec: Arc<Recorder>) -> Self {
        Self {
            rec,
            handler: Arc::new(Mutex::new(None)),
            fail: None,
        }
    }

    pub fn failing(rec: Arc<Recorder>, error: IrqError) -> Self {
        Self {
            fail: Some(error),
            ..Self::new(rec)
        }
    }

    /// Run the registered handler once, as the threaded handler would.
    /// Returns `false` if nothing is registered.
    pub fn fire(&self) -> bool {
        let Some(mut handler) = self.handler.lock().unwrap().take() else {
            return false;
        };
        handler();
        let mut slot = self.handler.lock().unwrap();
        if slot.is_none() {
            *slot = Some(handler);
        }
        true
    }

    pub fn is_registered(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }
}

impl InterruptPort for MockIrq {
    type Registration = LineId;

    fn register(
        &mut self,
        line: LineId,
        edge: Edge,
        _name: &'static str,
        handler: IrqHandler,
    ) -> Result<LineId, IrqError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        self.rec.push(Call::Register { line, edge });
        *self.handler.lock().unwrap() = Some(handler);
        Ok(line)
    }

    fn unregister(&mut self, line: LineId) {
        self.handler.lock().unwrap().take();
        self.rec.push(Call::Unregister(line));
    }
}

// ── Timers ────────────────────────────────────────────────────

/// Virtual timers that refuse to create the `n`th timer (0-based).
pub struct FailingTimers {
    pub inner: VirtualTimers,
    fail_at: usize,
    created: AtomicUsize,
}

#[allow(dead_code)]
impl FailingTimers {
    pub fn new(fail_at: usize) -> Self {
        Self {
            inner: VirtualTimers::new(),
            fail_at,
            created: AtomicUsize::new(0),
        }
    }
}

impl TimerPort for FailingTimers {
    type Timer = VirtualTimer;

    fn create(&self, name: &'static str, callback: TimerCallback) -> Result<VirtualTimer, TimerError> {
        if self.created.fetch_add(1, Ordering::Relaxed) == self.fail_at {
            return Err(TimerError::CreateFailed(-12));
        }
        self.inner.create(name, callback)
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ControllerEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<ControllerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &ControllerEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &ControllerEvent) {
        self.events.lock().unwrap().push(*event);
    }
}
