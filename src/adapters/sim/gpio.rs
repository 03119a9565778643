//! Simulated line providers for host runs.
//!
//! A [`SimGpio`] exposes one or more labelled providers ("chips"), each
//! owning a contiguous range of global line numbers, over a shared
//! [`SimBus`] that holds every line's level.  The bus is also the stimulus
//! side: tests and the host binary press the button with
//! [`SimBus::set_input`], and the simulated interrupt layer subscribes to
//! level changes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::app::ports::{ChipId, GpioPort, InputLine, LineId, OutputLine};
use crate::config::PROVIDER_NAME_LEN;
use crate::error::LineError;

/// Called with the new level whenever an input line changes.
pub type LevelListener = Box<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Default, Clone, Copy)]
struct LineState {
    level: bool,
    consumer: Option<&'static str>,
    output: bool,
    transitions: u64,
}

// ── Bus ───────────────────────────────────────────────────────

/// Levels and ownership of every simulated line.
#[derive(Default)]
pub struct SimBus {
    lines: Mutex<HashMap<LineId, LineState>>,
    listeners: Mutex<HashMap<LineId, LevelListener>>,
}

impl SimBus {
    fn with_line<R>(&self, line: LineId, f: impl FnOnce(&mut LineState) -> R) -> R {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        f(lines.entry(line).or_default())
    }

    pub fn level(&self, line: LineId) -> bool {
        self.with_line(line, |s| s.level)
    }

    /// Number of level changes since the line was first touched.
    pub fn transitions(&self, line: LineId) -> u64 {
        self.with_line(line, |s| s.transitions)
    }

    /// Consumer label of the current holder, if claimed.
    pub fn consumer(&self, line: LineId) -> Option<&'static str> {
        self.with_line(line, |s| s.consumer)
    }

    pub fn is_output(&self, line: LineId) -> bool {
        self.with_line(line, |s| s.output)
    }

    /// Drive an input from outside (a finger on the button).
    pub fn set_input(&self, line: LineId, high: bool) {
        let changed = self.with_line(line, |s| {
            let changed = s.level != high;
            if changed {
                s.level = high;
                s.transitions += 1;
            }
            changed
        });
        if changed {
            let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(listener) = listeners.get(&line) {
                listener(high);
            }
        }
    }

    pub fn subscribe(&self, line: LineId, listener: LevelListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(line, listener);
    }

    pub fn unsubscribe(&self, line: LineId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&line);
    }

    fn drive(&self, line: LineId, on: bool) {
        self.with_line(line, |s| {
            if s.level != on {
                s.level = on;
                s.transitions += 1;
            }
        });
    }

    fn claim(&self, line: LineId, consumer: &'static str, output: bool) -> Result<(), LineError> {
        self.with_line(line, |s| {
            if s.consumer.is_some() {
                return Err(LineError::Busy);
            }
            s.consumer = Some(consumer);
            s.output = output;
            Ok(())
        })
    }

    fn free(&self, line: LineId) {
        self.with_line(line, |s| {
            s.consumer = None;
            s.output = false;
        });
    }
}

// ── Line handles ──────────────────────────────────────────────

pub struct SimOutput {
    line: LineId,
    bus: Arc<SimBus>,
    released: AtomicBool,
}

impl SimOutput {
    pub fn line(&self) -> LineId {
        self.line
    }
}

impl OutputLine for SimOutput {
    fn set(&self, on: bool) {
        if !self.released.load(Ordering::Acquire) {
            self.bus.drive(self.line, on);
        }
    }
}

pub struct SimInput {
    line: LineId,
    bus: Arc<SimBus>,
    released: AtomicBool,
}

impl SimInput {
    pub fn line(&self) -> LineId {
        self.line
    }
}

impl InputLine for SimInput {
    fn is_high(&self) -> Result<bool, LineError> {
        if self.released.load(Ordering::Acquire) {
            return Err(LineError::NotOwned);
        }
        Ok(self.bus.level(self.line))
    }
}

// ── Providers ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SimChip {
    label: heapless::String<PROVIDER_NAME_LEN>,
    base: LineId,
    ngpio: u32,
}

impl SimChip {
    fn owns(&self, line: LineId) -> bool {
        line >= self.base && line - self.base < self.ngpio
    }
}

/// Set of simulated providers sharing one [`SimBus`].
#[derive(Default)]
pub struct SimGpio {
    chips: Vec<SimChip>,
    bus: Arc<SimBus>,
    failures: HashMap<LineId, LineError>,
}

impl SimGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single 58-line provider labelled like the reference board's.
    pub fn reference_board() -> Self {
        Self::new().with_chip(crate::pins::PROVIDER_LABEL, 0, 58)
    }

    /// Add a provider owning lines `base..base + ngpio`.  Labels longer
    /// than the hint capacity are truncated.
    #[must_use]
    pub fn with_chip(mut self, label: &str, base: LineId, ngpio: u32) -> Self {
        let mut name = heapless::String::new();
        for c in label.chars() {
            if name.push(c).is_err() {
                break;
            }
        }
        self.chips.push(SimChip { label: name, base, ngpio });
        self
    }

    /// Make the next request for `line` fail with `error`.
    pub fn fail_line(&mut self, line: LineId, error: LineError) {
        self.failures.insert(line, error);
    }

    pub fn bus(&self) -> Arc<SimBus> {
        Arc::clone(&self.bus)
    }

    fn check(&mut self, chip: ChipId, line: LineId) -> Result<(), LineError> {
        let owner = self.chips.get(chip.0).ok_or(LineError::NoProvider)?;
        if !owner.owns(line) {
            return Err(LineError::NotOwned);
        }
        match self.failures.remove(&line) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl GpioPort for SimGpio {
    type Output = SimOutput;
    type Input = SimInput;

    fn find_chip_by_label(&self, label: &str) -> Option<ChipId> {
        self.chips.iter().position(|c| c.label == label).map(ChipId)
    }

    fn find_chip_for_line(&self, line: LineId) -> Option<ChipId> {
        self.chips.iter().position(|c| c.owns(line)).map(ChipId)
    }

    fn chip_label(&self, chip: ChipId) -> &str {
        self.chips.get(chip.0).map_or("", |c| c.label.as_str())
    }

    fn request_output(
        &mut self,
        chip: ChipId,
        line: LineId,
        consumer: &'static str,
        initial: bool,
    ) -> Result<SimOutput, LineError> {
        self.check(chip, line)?;
        self.bus.claim(line, consumer, true)?;
        self.bus.drive(line, initial);
        Ok(SimOutput {
            line,
            bus: Arc::clone(&self.bus),
            released: AtomicBool::new(false),
        })
    }

    fn request_input(&mut self, chip: ChipId, line: LineId, consumer: &'static str) -> Result<SimInput, LineError> {
        self.check(chip, line)?;
        self.bus.claim(line, consumer, false)?;
        Ok(SimInput {
            line,
            bus: Arc::clone(&self.bus),
            released: AtomicBool::new(false),
        })
    }

    fn release_output(&mut self, line: &SimOutput) {
        if !line.released.swap(true, Ordering::AcqRel) {
            self.bus.free(line.line);
        }
    }

    fn release_input(&mut self, line: &SimInput) {
        if !line.released.swap(true, Ordering::AcqRel) {
            self.bus.free(line.line);
        }
    }
}
