//! Deterministic timer service driven by a manual clock.
//!
//! Nothing fires until [`VirtualTimers::advance`] is called; expiries are
//! then processed strictly in deadline order (ties by creation order), so
//! tests can step the PWM engine tick by tick.  Cancel-and-wait is
//! trivial here: callbacks only run inside `advance`, on the caller's
//! thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::app::ports::{Rearm, TimerCallback, TimerHandle, TimerPort, next_deadline};
use crate::error::TimerError;

struct Slot {
    name: &'static str,
    deadline: Option<Duration>,
    generation: u64,
    callback: Option<TimerCallback>,
    fired: u64,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    slots: Vec<Slot>,
}

/// Cloneable handle to one virtual clock and its timers.
#[derive(Clone, Default)]
pub struct VirtualTimers {
    clock: Arc<Mutex<Clock>>,
}

impl VirtualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of pending timers.
    pub fn armed(&self) -> usize {
        self.lock().slots.iter().filter(|s| s.deadline.is_some()).count()
    }

    /// Times the named timer's callback has run.
    pub fn fired(&self, name: &str) -> u64 {
        self.lock()
            .slots
            .iter()
            .filter(|s| s.name == name)
            .map(|s| s.fired)
            .sum()
    }

    /// Whether the named timer is pending.
    pub fn is_armed(&self, name: &str) -> bool {
        self.lock().slots.iter().any(|s| s.name == name && s.deadline.is_some())
    }

    /// Move the clock forward by `by`, running every callback due on the
    /// way.  Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = 0;

        loop {
            let mut clock = self.lock();
            let due = clock
                .slots
                .iter()
                .enumerate()
                .filter_map(|(id, s)| s.deadline.map(|d| (d, id)))
                .filter(|(d, _)| *d <= target)
                .min();
            let Some((scheduled, id)) = due else {
                clock.now = target;
                return ran;
            };

            clock.now = scheduled;
            let slot = &mut clock.slots[id];
            slot.deadline = None;
            slot.fired += 1;
            let generation = slot.generation;
            let Some(mut callback) = slot.callback.take() else {
                continue;
            };
            drop(clock);

            let rearm = callback();
            ran += 1;

            let mut clock = self.lock();
            let now = clock.now;
            let slot = &mut clock.slots[id];
            slot.callback = Some(callback);
            if let Rearm::After(period) = rearm {
                if slot.generation == generation {
                    slot.deadline = Some(next_deadline(scheduled, period, now));
                }
            }
        }
    }
}

impl TimerPort for VirtualTimers {
    type Timer = VirtualTimer;

    fn create(&self, name: &'static str, callback: TimerCallback) -> Result<VirtualTimer, TimerError> {
        let mut clock = self.lock();
        clock.slots.push(Slot {
            name,
            deadline: None,
            generation: 0,
            callback: Some(callback),
            fired: 0,
        });
        Ok(VirtualTimer {
            timers: self.clone(),
            id: clock.slots.len() - 1,
        })
    }
}

pub struct VirtualTimer {
    timers: VirtualTimers,
    id: usize,
}

impl TimerHandle for VirtualTimer {
    fn start(&self, delay: Duration) {
        let mut clock = self.timers.lock();
        let deadline = clock.now + delay;
        let slot = &mut clock.slots[self.id];
        slot.generation += 1;
        slot.deadline = Some(deadline);
    }

    fn cancel(&self) -> bool {
        let mut clock = self.timers.lock();
        let slot = &mut clock.slots[self.id];
        slot.generation += 1;
        slot.deadline.take().is_some()
    }
}

impl Drop for VirtualTimer {
    fn drop(&mut self) {
        let mut clock = self.timers.lock();
        let slot = &mut clock.slots[self.id];
        slot.deadline = None;
        slot.callback = None;
    }
}
