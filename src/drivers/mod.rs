//! Mode behaviours driven by timers and the button interrupt, plus
//! worker-thread placement for the platform backends.

pub mod button;
pub mod pwm;
pub mod task_pin;
pub mod toggle;
