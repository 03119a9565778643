//! Host-side backends for the port traits.
//!
//! | Backend          | Implements     | Used by                          |
//! |------------------|----------------|----------------------------------|
//! | `SimGpio`        | GpioPort       | host binary, runtime tests       |
//! | `HostTimerService` | TimerPort    | host binary, runtime tests       |
//! | `VirtualTimers`  | TimerPort      | deterministic integration tests  |
//! | `SimIrq`         | InterruptPort  | host binary, runtime tests       |

pub mod gpio;
pub mod irq;
pub mod timer;
pub mod virtual_timer;

pub use gpio::{SimBus, SimGpio};
pub use irq::SimIrq;
pub use timer::HostTimerService;
pub use virtual_timer::VirtualTimers;
