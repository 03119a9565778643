//! Threaded GPIO interrupts.
//!
//! The hard ISR only masks the pin and notifies the handler task; the
//! handler runs in a pinned worker thread, then unmasks the pin.  This
//! gives the oneshot semantics the button handler expects: no further
//! edge is delivered while the handler runs.
//!
//! ```text
//!   GPIO edge ──▶ gpio_isr (mask, notify) ──▶ irq/button task ──▶ handler()
//!                                                     │
//!                                  gpio_intr_enable ◀─┘
//! ```

use core::ffi::c_void;
use core::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

use esp_idf_hal::delay::BLOCK;
use esp_idf_hal::task::notification::{Notification, Notifier};
use esp_idf_svc::sys::*;
use log::{debug, error};

use crate::app::ports::{Edge, InterruptPort, IrqHandler, LineId};
use crate::drivers::task_pin::{Core, WorkerSpec, spawn_worker};
use crate::error::IrqError;

const IRQ_WORKER: WorkerSpec = WorkerSpec {
    name: "irq/button\0",
    core: Core::App,
    priority: 10,
    stack_kb: 8,
};

const WAKE: NonZeroU32 = NonZeroU32::MIN;

struct IsrCtx {
    pin: i32,
    notifier: Arc<Notifier>,
}

unsafe extern "C" fn gpio_isr(arg: *mut c_void) {
    // SAFETY: `arg` is the IsrCtx boxed by `register`; it outlives the
    // handler, which `unregister` removes before freeing it.
    let ctx = unsafe { &*arg.cast::<IsrCtx>() };
    // SAFETY: ISR-safe register write and task notification.
    unsafe {
        gpio_intr_disable(ctx.pin);
        ctx.notifier.notify_and_yield(WAKE);
    }
}

fn intr_type(edge: Edge) -> gpio_int_type_t {
    match edge {
        Edge::Rising => gpio_int_type_t_GPIO_INTR_POSEDGE,
        Edge::Falling => gpio_int_type_t_GPIO_INTR_NEGEDGE,
        Edge::Both => gpio_int_type_t_GPIO_INTR_ANYEDGE,
    }
}

pub struct EspIrqRegistration {
    pin: i32,
    ctx: *mut IsrCtx,
    stop: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

// SAFETY: `ctx` is only dereferenced by the ISR and freed by `unregister`.
unsafe impl Send for EspIrqRegistration {}

/// Per-pin GPIO ISR service.
pub struct EspIrq {
    registered: u64,
}

impl EspIrq {
    /// Install the shared GPIO ISR service.
    pub fn new() -> Result<Self, IrqError> {
        // SAFETY: ESP_ERR_INVALID_STATE means the service is already
        // installed, which is fine.
        let rc = unsafe { gpio_install_isr_service(0) };
        if rc != ESP_OK && rc != ESP_ERR_INVALID_STATE {
            return Err(IrqError::Io(rc));
        }
        Ok(Self { registered: 0 })
    }
}

impl InterruptPort for EspIrq {
    type Registration = EspIrqRegistration;

    fn register(
        &mut self,
        line: LineId,
        edge: Edge,
        name: &'static str,
        mut handler: IrqHandler,
    ) -> Result<EspIrqRegistration, IrqError> {
        if line >= gpio_num_t_GPIO_NUM_MAX as LineId {
            return Err(IrqError::NoIrq);
        }
        if self.registered & (1 << line) != 0 {
            return Err(IrqError::AlreadyRegistered);
        }
        let pin = line as i32;

        // The notification belongs to the task that waits on it, so the
        // worker creates it and hands the notifier back.
        let (notifier_tx, notifier_rx) = mpsc::sync_channel(1);
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let worker = spawn_worker(IRQ_WORKER, move || {
            let notification = Notification::new();
            if notifier_tx.send(notification.notifier()).is_err() {
                return;
            }
            loop {
                notification.wait(BLOCK);
                if worker_stop.load(Ordering::Acquire) {
                    break;
                }
                handler();
                // SAFETY: re-enables the pin masked by the ISR.
                unsafe {
                    gpio_intr_enable(pin);
                }
            }
        })
        .map_err(|e| {
            error!("irq: handler task for GPIO{} failed: {}", pin, e);
            IrqError::SpawnFailed
        })?;
        let notifier = notifier_rx.recv().map_err(|_| IrqError::SpawnFailed)?;

        let ctx = Box::into_raw(Box::new(IsrCtx {
            pin,
            notifier: Arc::clone(&notifier),
        }));
        // SAFETY: pin is a configured input; ctx stays valid until
        // unregister removes the handler.
        let rc = unsafe {
            let rc = gpio_set_intr_type(pin, intr_type(edge));
            if rc == ESP_OK { gpio_isr_handler_add(pin, Some(gpio_isr), ctx.cast()) } else { rc }
        };
        if rc != ESP_OK {
            stop.store(true, Ordering::Release);
            // SAFETY: task notification from task context.
            unsafe {
                notifier.notify_and_yield(WAKE);
            }
            let _ = worker.join();
            // SAFETY: the ISR was never installed.
            drop(unsafe { Box::from_raw(ctx) });
            return Err(IrqError::Io(rc));
        }
        // SAFETY: handler installed above.
        unsafe {
            gpio_intr_enable(pin);
        }

        self.registered |= 1 << line;
        debug!("irq: '{}' on GPIO{} ({:?})", name, pin, edge);
        Ok(EspIrqRegistration {
            pin,
            ctx,
            stop,
            worker,
        })
    }

    fn unregister(&mut self, registration: EspIrqRegistration) {
        let EspIrqRegistration { pin, ctx, stop, worker } = registration;
        // SAFETY: after removal the ISR can no longer observe ctx.
        unsafe {
            gpio_intr_disable(pin);
            gpio_isr_handler_remove(pin);
        }
        stop.store(true, Ordering::Release);
        // SAFETY: ctx is still live; notify from task context.
        unsafe {
            (*ctx).notifier.notify_and_yield(WAKE);
        }
        if worker.join().is_err() {
            error!("irq: handler for GPIO{} panicked", pin);
        }
        // SAFETY: no ISR or worker references ctx any more.
        drop(unsafe { Box::from_raw(ctx) });
        self.registered &= !(1 << pin);
        debug!("irq: GPIO{} unregistered", pin);
    }
}
