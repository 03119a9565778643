//! ESP32 GPIO matrix as a single line provider.
//!
//! Lines are raw GPIO numbers driven through `gpio_set_level` /
//! `gpio_get_level`, wrapped in the `embedded-hal` bridge so release
//! semantics match every other backend.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use esp_idf_svc::sys::*;
use log::debug;

use crate::adapters::hal_line::{HalInput, HalOutput};
use crate::app::ports::{ChipId, GpioPort, LineId};
use crate::error::LineError;

/// The only provider on this target.
const CHIP_LABEL: &str = "gpio";

/// A raw GPIO number implementing the `embedded-hal` digital traits.
#[derive(Debug)]
pub struct RawPin(i32);

#[derive(Debug)]
pub struct RawPinError(pub i32);

impl embedded_hal::digital::Error for RawPinError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl ErrorType for RawPin {
    type Error = RawPinError;
}

impl OutputPin for RawPin {
    fn set_low(&mut self) -> Result<(), RawPinError> {
        // SAFETY: pin number validated at request time; register write.
        esp_result(unsafe { gpio_set_level(self.0, 0) })
    }

    fn set_high(&mut self) -> Result<(), RawPinError> {
        // SAFETY: as above.
        esp_result(unsafe { gpio_set_level(self.0, 1) })
    }
}

impl InputPin for RawPin {
    fn is_high(&mut self) -> Result<bool, RawPinError> {
        // SAFETY: register read of a configured input.
        Ok(unsafe { gpio_get_level(self.0) } != 0)
    }

    fn is_low(&mut self) -> Result<bool, RawPinError> {
        self.is_high().map(|h| !h)
    }
}

fn esp_result(rc: esp_err_t) -> Result<(), RawPinError> {
    if rc == ESP_OK { Ok(()) } else { Err(RawPinError(rc)) }
}

fn line_result(rc: esp_err_t) -> Result<(), LineError> {
    if rc == ESP_OK { Ok(()) } else { Err(LineError::Io(rc)) }
}

/// The GPIO matrix.  Tracks claimed lines in a bitmask.
pub struct EspGpio {
    claimed: u64,
}

impl EspGpio {
    pub fn new() -> Self {
        Self { claimed: 0 }
    }

    fn claim(&mut self, line: LineId) -> Result<i32, LineError> {
        if line >= gpio_num_t_GPIO_NUM_MAX as LineId {
            return Err(LineError::NotOwned);
        }
        let bit = 1u64 << line;
        if self.claimed & bit != 0 {
            return Err(LineError::Busy);
        }
        self.claimed |= bit;
        Ok(line as i32)
    }

    fn unclaim(&mut self, pin: i32) {
        self.claimed &= !(1u64 << pin);
        // SAFETY: returns the pin to its reset state; pin was claimed by us.
        unsafe {
            gpio_reset_pin(pin);
        }
        debug!("gpio: released GPIO{}", pin);
    }
}

impl Default for EspGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioPort for EspGpio {
    type Output = HalOutput<RawPin>;
    type Input = HalInput<RawPin>;

    fn find_chip_by_label(&self, label: &str) -> Option<ChipId> {
        (label == CHIP_LABEL).then_some(ChipId(0))
    }

    fn find_chip_for_line(&self, line: LineId) -> Option<ChipId> {
        (line < gpio_num_t_GPIO_NUM_MAX as LineId).then_some(ChipId(0))
    }

    fn chip_label(&self, _chip: ChipId) -> &str {
        CHIP_LABEL
    }

    fn request_output(
        &mut self,
        _chip: ChipId,
        line: LineId,
        consumer: &'static str,
        initial: bool,
    ) -> Result<Self::Output, LineError> {
        let pin = self.claim(line)?;
        // SAFETY: single-owner pin configuration from the startup path.
        let configured = unsafe {
            line_result(gpio_reset_pin(pin))
                .and_then(|()| line_result(gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_OUTPUT)))
                .and_then(|()| line_result(gpio_set_level(pin, u32::from(initial))))
        };
        if let Err(e) = configured {
            self.unclaim(pin);
            return Err(e);
        }
        debug!("gpio: GPIO{} -> output '{}' (initial {})", pin, consumer, initial);
        Ok(HalOutput::new(line, RawPin(pin)))
    }

    fn request_input(&mut self, _chip: ChipId, line: LineId, consumer: &'static str) -> Result<Self::Input, LineError> {
        let pin = self.claim(line)?;
        // SAFETY: single-owner pin configuration from the startup path.
        let configured = unsafe {
            line_result(gpio_reset_pin(pin))
                .and_then(|()| line_result(gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT)))
                .and_then(|()| line_result(gpio_set_pull_mode(pin, gpio_pull_mode_t_GPIO_PULLDOWN_ONLY)))
        };
        if let Err(e) = configured {
            self.unclaim(pin);
            return Err(e);
        }
        debug!("gpio: GPIO{} -> input '{}'", pin, consumer);
        Ok(HalInput::new(line, RawPin(pin)))
    }

    fn release_output(&mut self, line: &Self::Output) {
        if let Some(RawPin(pin)) = line.release() {
            self.unclaim(pin);
        }
    }

    fn release_input(&mut self, line: &Self::Input) {
        if let Some(RawPin(pin)) = line.release() {
            self.unclaim(pin);
        }
    }
}
