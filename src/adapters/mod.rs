//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                         | Connects to                   |
//! |-------------|------------------------------------|-------------------------------|
//! | `esp`       | GpioPort, TimerPort, InterruptPort | ESP32 GPIO, esp_timer, ISRs   |
//! | `sim`       | GpioPort, TimerPort, InterruptPort | In-process line bus + threads |
//! | `cancel_gate` | (used by `esp::timer`)            | Cancel-and-wait handshake     |
//! | `hal_line`  | OutputLine, InputLine              | Any `embedded-hal` pin        |
//! | `log_sink`  | EventSink                          | Serial / terminal log output  |

pub mod cancel_gate;
#[cfg(target_os = "espidf")]
pub mod esp;
pub mod hal_line;
pub mod log_sink;
pub mod sim;
