//! Fuzz target: controller config loading
//!
//! Feeds arbitrary bytes to `ControllerConfig::from_json` and, for every
//! document that parses, checks that validation:
//! - never panics
//! - yields no zero period, resolution or step
//! - keeps the tick interval at or above 1 µs
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use core::time::Duration;

use breathctl::config::ControllerConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = ControllerConfig::from_json(text) else {
        return;
    };

    let t = config.validate();
    assert!(t.toggle_period >= Duration::from_millis(1));
    assert!(t.pwm_base_period >= Duration::from_micros(1));
    assert!(t.resolution >= 1);
    assert!(t.step >= 1);
    assert!(t.step_interval >= Duration::from_millis(1));
    assert!(t.tick_interval >= Duration::from_micros(1));
    assert!(config.line_provider_name.len() <= breathctl::config::PROVIDER_NAME_LEN);
});
