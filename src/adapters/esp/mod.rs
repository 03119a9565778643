//! ESP-IDF implementations of the line, timer and interrupt ports.
//!
//! | Adapter            | Port            | Backend                          |
//! |--------------------|-----------------|----------------------------------|
//! | [`EspGpio`]        | `GpioPort`      | `gpio_*` via `embedded-hal` pins |
//! | [`EspTimerService`]| `TimerPort`     | `esp_timer` one-shots            |
//! | [`EspIrq`]         | `InterruptPort` | GPIO ISR service + handler task  |

pub mod gpio;
pub mod irq;
pub mod timer;

pub use gpio::EspGpio;
pub use irq::EspIrq;
pub use timer::EspTimerService;
