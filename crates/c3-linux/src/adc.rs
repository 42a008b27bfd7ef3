//! `c3_core::hal::Adc` over a kernel IIO sysfs raw-value channel, used for
//! the OPD battery-bus current sense input.

use c3_core::hal::Adc;
use c3_core::C3Error;
use std::fs;

pub struct LinuxAdc {
    path: String,
}

impl LinuxAdc {
    pub fn new(device: u32, channel: u32) -> Self {
        Self {
            path: format!("/sys/bus/iio/devices/iio:device{device}/in_voltage{channel}_raw"),
        }
    }
}

impl Adc for LinuxAdc {
    fn read_raw(&mut self) -> Result<u16, C3Error> {
        let raw = fs::read_to_string(&self.path).map_err(|_| C3Error::Adc(0))?;
        raw.trim().parse().map_err(|_| C3Error::Adc(0))
    }
}
