//! Fuzz target: software-PWM ramp and counter
//!
//! Drives `ramp_step` / `advance_counter` with arbitrary parameters and
//! start states and verifies:
//! - duty never leaves [0, resolution]
//! - the counter never reaches resolution
//! - no arithmetic overflow near `u32::MAX`
//!
//! cargo fuzz run fuzz_pwm_ramp

#![no_main]

use breathctl::drivers::pwm::{Direction, advance_counter, ramp_step};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u32, u32, u32, bool, u16)| {
    let (resolution, step, start, falling, steps) = input;
    let resolution = resolution.max(1);
    let step = step.max(1);

    let mut duty = start.min(resolution);
    let mut direction = if falling { Direction::Down } else { Direction::Up };
    let mut counter = start % resolution;

    for _ in 0..steps {
        (duty, direction) = ramp_step(duty, direction, step, resolution);
        assert!(duty <= resolution);
        counter = advance_counter(counter, resolution);
        assert!(counter < resolution);
    }
});
