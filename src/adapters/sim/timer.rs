//! Real-time timer service for host runs.
//!
//! One dispatcher thread owns a min-heap of deadlines and runs callbacks
//! with the queue lock released.  Each timer slot carries a generation
//! number: `start` and `cancel` bump it, which invalidates any heap entry
//! or in-flight re-arm belonging to the previous arming.
//!
//! ```text
//!   start ──▶ heap (deadline, id, gen) ──▶ dispatcher ──▶ callback
//!                       ▲                                   │
//!                       └──── Rearm::After(period) ◀────────┘
//!                             (deadline + period, same gen)
//! ```
//!
//! `cancel` waits on a condvar until the slot's callback is no longer
//! running, which gives the cancel-and-wait guarantee the mode controller
//! relies on.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::app::ports::{Rearm, TimerCallback, TimerHandle, TimerPort, next_deadline};
use crate::drivers::task_pin::{Core, WorkerSpec, spawn_worker};
use crate::error::TimerError;

const DISPATCHER: WorkerSpec = WorkerSpec {
    name: "hrtimer\0",
    core: Core::Pro,
    priority: 22,
    stack_kb: 64,
};

struct Slot {
    name: &'static str,
    generation: u64,
    armed: bool,
    running: bool,
    live: bool,
    callback: Option<TimerCallback>,
}

#[derive(Default)]
struct Queue {
    heap: BinaryHeap<Reverse<(Duration, usize, u64)>>,
    slots: Vec<Slot>,
    stopping: bool,
}

struct Inner {
    epoch: Instant,
    queue: Mutex<Queue>,
    /// Signalled when the heap head changes or the service stops.
    wake: Condvar,
    /// Signalled after every callback returns.
    idle: Condvar,
    dispatcher: OnceLock<ThreadId>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn on_dispatcher(&self) -> bool {
        self.dispatcher.get() == Some(&thread::current().id())
    }
}

// ── Service ───────────────────────────────────────────────────

pub struct HostTimerService {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
}

impl HostTimerService {
    pub fn new() -> io::Result<Self> {
        let inner = Arc::new(Inner {
            epoch: Instant::now(),
            queue: Mutex::new(Queue::default()),
            wake: Condvar::new(),
            idle: Condvar::new(),
            dispatcher: OnceLock::new(),
        });
        let worker_inner = Arc::clone(&inner);
        let worker = spawn_worker(DISPATCHER, move || dispatch(&worker_inner))?;
        Ok(Self {
            inner,
            worker: Some(worker),
        })
    }
}

impl TimerPort for HostTimerService {
    type Timer = HostTimer;

    fn create(&self, name: &'static str, callback: TimerCallback) -> Result<HostTimer, TimerError> {
        let mut q = self.inner.lock();
        if q.stopping {
            return Err(TimerError::ServiceStopped);
        }
        q.slots.push(Slot {
            name,
            generation: 0,
            armed: false,
            running: false,
            live: true,
            callback: Some(callback),
        });
        Ok(HostTimer {
            inner: Arc::clone(&self.inner),
            id: q.slots.len() - 1,
        })
    }
}

impl Drop for HostTimerService {
    fn drop(&mut self) {
        self.inner.lock().stopping = true;
        self.inner.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("hrtimer: dispatcher panicked");
            }
        }
    }
}

fn dispatch(inner: &Inner) {
    let _ = inner.dispatcher.set(thread::current().id());
    let mut q = inner.lock();
    loop {
        if q.stopping {
            return;
        }

        let now = inner.now();
        match q.heap.peek() {
            None => {
                q = inner.wake.wait(q).unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            Some(Reverse((deadline, _, _))) if *deadline > now => {
                let wait = *deadline - now;
                q = inner.wake.wait_timeout(q, wait).unwrap_or_else(PoisonError::into_inner).0;
                continue;
            }
            Some(_) => {}
        }

        let Some(Reverse((scheduled, id, generation))) = q.heap.pop() else {
            continue;
        };
        let slot = &mut q.slots[id];
        if !slot.armed || slot.generation != generation {
            continue;
        }
        let Some(mut callback) = slot.callback.take() else {
            continue;
        };
        slot.armed = false;
        slot.running = true;
        drop(q);

        let rearm = callback();

        q = inner.lock();
        let queue = &mut *q;
        let slot = &mut queue.slots[id];
        slot.running = false;
        if slot.live {
            slot.callback = Some(callback);
            if let Rearm::After(period) = rearm {
                if slot.generation == generation {
                    slot.armed = true;
                    let next = next_deadline(scheduled, period, inner.now());
                    queue.heap.push(Reverse((next, id, generation)));
                }
            }
        }
        inner.idle.notify_all();
    }
}

// ── Timer handle ──────────────────────────────────────────────

pub struct HostTimer {
    inner: Arc<Inner>,
    id: usize,
}

impl HostTimer {
    pub fn name(&self) -> &'static str {
        self.inner.lock().slots[self.id].name
    }

    fn cancel_locked<'a>(&'a self, mut q: MutexGuard<'a, Queue>) -> (bool, MutexGuard<'a, Queue>) {
        let slot = &mut q.slots[self.id];
        let was_active = slot.armed || slot.running;
        slot.armed = false;
        slot.generation += 1;

        if !self.inner.on_dispatcher() {
            while q.slots[self.id].running {
                q = self.inner.idle.wait(q).unwrap_or_else(PoisonError::into_inner);
            }
        }
        (was_active, q)
    }
}

impl TimerHandle for HostTimer {
    fn start(&self, delay: Duration) {
        let mut q = self.inner.lock();
        let deadline = self.inner.now() + delay;
        let queue = &mut *q;
        let slot = &mut queue.slots[self.id];
        slot.generation += 1;
        slot.armed = true;
        queue.heap.push(Reverse((deadline, self.id, slot.generation)));
        drop(q);
        self.inner.wake.notify_all();
    }

    fn cancel(&self) -> bool {
        let q = self.inner.lock();
        self.cancel_locked(q).0
    }
}

impl Drop for HostTimer {
    fn drop(&mut self) {
        let q = self.inner.lock();
        let (_, mut q) = self.cancel_locked(q);
        let slot = &mut q.slots[self.id];
        slot.live = false;
        slot.callback = None;
    }
}
