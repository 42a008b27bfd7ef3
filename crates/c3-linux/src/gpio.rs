//! `c3_core::hal::Gpio` over the sysfs GPIO interface
//! (`/sys/class/gpio/gpioN/{direction,value}`), used for the two discrete
//! lines the OPD subsystem drives directly: battery-bus enable and fault.

use c3_core::hal::Gpio;
use c3_core::C3Error;
use std::fs;

pub struct LinuxGpio {
    line: u32,
}

impl LinuxGpio {
    /// Exports (if needed) and configures `line` for output, starting low.
    pub fn new_output(line: u32) -> Result<Self, C3Error> {
        let gpio = Self::new(line)?;
        fs::write(gpio.path("direction"), "low").map_err(|_| C3Error::Gpio("direction", "failed to configure as output"))?;
        Ok(gpio)
    }

    /// Exports (if needed) and configures `line` for input.
    pub fn new_input(line: u32) -> Result<Self, C3Error> {
        let gpio = Self::new(line)?;
        fs::write(gpio.path("direction"), "in").map_err(|_| C3Error::Gpio("direction", "failed to configure as input"))?;
        Ok(gpio)
    }

    fn new(line: u32) -> Result<Self, C3Error> {
        let gpio = Self { line };
        if fs::metadata(format!("/sys/class/gpio/gpio{line}")).is_err() {
            fs::write("/sys/class/gpio/export", line.to_string())
                .map_err(|_| C3Error::Gpio("export", "failed to export line"))?;
        }
        Ok(gpio)
    }

    fn path(&self, leaf: &str) -> String {
        format!("/sys/class/gpio/gpio{}/{leaf}", self.line)
    }
}

impl Gpio for LinuxGpio {
    fn set_high(&mut self) -> Result<(), C3Error> {
        fs::write(self.path("value"), "1").map_err(|_| C3Error::Gpio("value", "failed to drive high"))
    }

    fn set_low(&mut self) -> Result<(), C3Error> {
        fs::write(self.path("value"), "0").map_err(|_| C3Error::Gpio("value", "failed to drive low"))
    }

    fn is_high(&self) -> Result<bool, C3Error> {
        let raw = fs::read_to_string(self.path("value")).map_err(|_| C3Error::Gpio("value", "failed to read"))?;
        Ok(raw.trim() == "1")
    }
}
