//! `esp_timer` backed one-shot timers.
//!
//! Callbacks are dispatched from the esp_timer task (not ISR context).
//! Each firing re-arms with `esp_timer_start_once` relative to the time it
//! was scheduled for, so periodic users do not accumulate latency drift.

use core::ffi::c_void;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use esp_idf_svc::sys::*;
use log::{error, warn};

use crate::adapters::cancel_gate::CancelGate;
use crate::app::ports::{Rearm, TimerCallback, TimerHandle, TimerPort, next_deadline};
use crate::error::TimerError;

struct TimerCtx {
    name: &'static str,
    callback: Mutex<TimerCallback>,
    handle: AtomicHandle,
    gate: CancelGate,
    /// Scheduled expiry of the pending firing, µs since boot.
    scheduled_us: AtomicU64,
}

/// `esp_timer_handle_t` stored once after creation.
struct AtomicHandle(core::sync::atomic::AtomicPtr<esp_timer>);

impl AtomicHandle {
    fn get(&self) -> esp_timer_handle_t {
        self.0.load(Ordering::Acquire)
    }
}

fn now_us() -> u64 {
    // SAFETY: RTC counter read.
    unsafe { esp_timer_get_time() }.max(0) as u64
}

fn duration_us(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX).max(1)
}

unsafe extern "C" fn timer_trampoline(arg: *mut c_void) {
    // SAFETY: `arg` is the boxed TimerCtx owned by the EspTimer that
    // created this esp_timer; EspTimer::drop deletes the timer before the
    // box is freed.
    let ctx = unsafe { &*arg.cast::<TimerCtx>() };
    let Some(_inside) = ctx.gate.enter() else {
        return;
    };

    let rearm = {
        let mut cb = ctx.callback.lock().unwrap_or_else(PoisonError::into_inner);
        (*cb)()
    };
    match rearm {
        Rearm::After(period) if ctx.gate.is_armed() => {
            let scheduled = Duration::from_micros(ctx.scheduled_us.load(Ordering::Relaxed));
            let now = Duration::from_micros(now_us());
            let next = next_deadline(scheduled, period, now);
            ctx.scheduled_us.store(duration_us(next), Ordering::Relaxed);
            let delay = next.saturating_sub(now);
            // SAFETY: handle is valid for the lifetime of ctx.
            let rc = unsafe { esp_timer_start_once(ctx.handle.get(), duration_us(delay)) };
            if rc != ESP_OK {
                warn!("timer '{}': re-arm failed (rc={})", ctx.name, rc);
                ctx.gate.disarm();
            }
        }
        Rearm::After(_) => {}
        Rearm::Stop => {
            ctx.gate.disarm();
        }
    }
}

/// Factory for [`EspTimer`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct EspTimerService;

impl TimerPort for EspTimerService {
    type Timer = EspTimer;

    fn create(&self, name: &'static str, callback: TimerCallback) -> Result<EspTimer, TimerError> {
        let ctx = Box::new(TimerCtx {
            name,
            callback: Mutex::new(callback),
            handle: AtomicHandle(core::sync::atomic::AtomicPtr::new(core::ptr::null_mut())),
            gate: CancelGate::new(),
            scheduled_us: AtomicU64::new(0),
        });
        let ctx = Box::into_raw(ctx);

        let args = esp_timer_create_args_t {
            callback: Some(timer_trampoline),
            arg: ctx.cast(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"breathctl\0".as_ptr().cast(),
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: args and the out-pointer are valid for the call.
        let rc = unsafe { esp_timer_create(&args, &mut handle) };
        if rc != ESP_OK {
            error!("timer '{}': esp_timer_create failed (rc={})", name, rc);
            // SAFETY: ctx came from Box::into_raw above and was never shared.
            drop(unsafe { Box::from_raw(ctx) });
            return Err(TimerError::CreateFailed(rc));
        }
        // SAFETY: ctx is live; no callback can run before the first start.
        unsafe { (*ctx).handle.0.store(handle, Ordering::Release) };
        Ok(EspTimer { ctx })
    }
}

pub struct EspTimer {
    ctx: *mut TimerCtx,
}

// SAFETY: TimerCtx is only accessed through atomics and a Mutex.
unsafe impl Send for EspTimer {}
// SAFETY: as above.
unsafe impl Sync for EspTimer {}

impl EspTimer {
    fn ctx(&self) -> &TimerCtx {
        // SAFETY: ctx stays allocated until Drop.
        unsafe { &*self.ctx }
    }
}

impl TimerHandle for EspTimer {
    fn start(&self, delay: Duration) {
        let ctx = self.ctx();
        let handle = ctx.handle.get();
        // SAFETY: handle is valid; stopping an idle timer is harmless.
        unsafe {
            esp_timer_stop(handle);
        }
        let delay_us = duration_us(delay);
        ctx.scheduled_us.store(now_us() + delay_us, Ordering::Relaxed);
        ctx.gate.arm();
        // SAFETY: as above.
        let rc = unsafe { esp_timer_start_once(handle, delay_us) };
        if rc != ESP_OK {
            warn!("timer '{}': start failed (rc={})", ctx.name, rc);
            ctx.gate.disarm();
        }
    }

    fn cancel(&self) -> bool {
        let ctx = self.ctx();
        let was_active = ctx.gate.disarm();
        // SAFETY: handle is valid until Drop.
        unsafe {
            esp_timer_stop(ctx.handle.get());
        }
        // SAFETY: yields the calling task for one tick.
        let waited = ctx.gate.wait_idle(|| unsafe { vTaskDelay(1) });
        was_active || waited
    }
}

impl Drop for EspTimer {
    fn drop(&mut self) {
        self.cancel();
        // SAFETY: the timer is stopped and no callback is running, so the
        // context can be released after the esp_timer is deleted.
        unsafe {
            esp_timer_delete(self.ctx().handle.get());
            drop(Box::from_raw(self.ctx));
        }
    }
}
