//! Threaded interrupt delivery for host runs.
//!
//! Each registration gets its own handler thread fed by a one-slot
//! `embassy-sync` channel.  The slot behaves like a masked one-shot line:
//! while the handler runs, at most one further edge stays pending and any
//! others are dropped.
//!
//! ```text
//!   SimBus::set_input ──▶ listener ──try_send──▶ [Edge] ──▶ irq thread ──▶ handler()
//!                                                  ▲
//!                          unregister ──send──▶ [Shutdown]
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future::block_on;
use log::{debug, error};

use super::gpio::SimBus;
use crate::app::ports::{Edge, InterruptPort, IrqHandler, LineId};
use crate::drivers::task_pin::{Core, WorkerSpec, spawn_worker};
use crate::error::IrqError;

enum IrqMsg {
    Edge,
    Shutdown,
}

type IrqChannel = Channel<CriticalSectionRawMutex, IrqMsg, 1>;

pub struct SimIrqRegistration {
    line: LineId,
    channel: Arc<IrqChannel>,
    worker: JoinHandle<()>,
}

/// Interrupt layer over a [`SimBus`].
pub struct SimIrq {
    bus: Arc<SimBus>,
    registered: Vec<LineId>,
}

impl SimIrq {
    pub fn new(bus: Arc<SimBus>) -> Self {
        Self {
            bus,
            registered: Vec::new(),
        }
    }
}

impl InterruptPort for SimIrq {
    type Registration = SimIrqRegistration;

    fn register(
        &mut self,
        line: LineId,
        edge: Edge,
        name: &'static str,
        mut handler: IrqHandler,
    ) -> Result<SimIrqRegistration, IrqError> {
        if self.registered.contains(&line) {
            return Err(IrqError::AlreadyRegistered);
        }

        let channel: Arc<IrqChannel> = Arc::new(Channel::new());
        let rx = Arc::clone(&channel);
        let spec = WorkerSpec {
            name,
            core: Core::App,
            priority: 10,
            stack_kb: 64,
        };
        let worker = spawn_worker(spec, move || {
            loop {
                match block_on(rx.receive()) {
                    IrqMsg::Edge => handler(),
                    IrqMsg::Shutdown => break,
                }
            }
        })
        .map_err(|e| {
            error!("irq: handler thread for line {} failed: {}", line, e);
            IrqError::SpawnFailed
        })?;

        let tx = Arc::clone(&channel);
        self.bus.subscribe(
            line,
            Box::new(move |level| {
                if edge.accepts(level) {
                    // Full means an edge is already pending.
                    let _ = tx.try_send(IrqMsg::Edge);
                }
            }),
        );
        self.registered.push(line);
        debug!("irq: '{}' registered on line {} ({:?})", name, line, edge);

        Ok(SimIrqRegistration { line, channel, worker })
    }

    fn unregister(&mut self, registration: SimIrqRegistration) {
        self.bus.unsubscribe(registration.line);
        self.registered.retain(|l| *l != registration.line);

        block_on(registration.channel.send(IrqMsg::Shutdown));
        if registration.worker.join().is_err() {
            error!("irq: handler for line {} panicked", registration.line);
        }
        debug!("irq: line {} unregistered", registration.line);
    }
}
