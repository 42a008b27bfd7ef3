//! `c3_core::hal::I2cBus` over Linux's `i2c-dev` character devices
//! (`/dev/i2c-N`), addressed per-transaction via the `I2C_SLAVE` ioctl.

use c3_core::hal::I2cBus;
use c3_core::C3Error;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;

// I2C_SLAVE predates the modern _IOC encoding convention and is a bare
// request number, not a `_IOW`-composed one — `ioctl_write_int_bad!` is
// nix's escape hatch for exactly this case.
nix::ioctl_write_int_bad!(i2c_set_slave, 0x0703);

/// One open `/dev/i2c-N` handle. The bus number is fixed at construction;
/// the target address is selected per-transaction, matching how the OPD
/// controller and node manager address many different I2C devices (MAX7310
/// expanders, the battery current ADC, F-RAM) over the same physical bus.
pub struct LinuxI2cBus {
    file: File,
    bus: u8,
}

impl LinuxI2cBus {
    pub fn open(bus: u8) -> Result<Self, C3Error> {
        let path = format!("/dev/i2c-{bus}");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|_| C3Error::I2c { bus, addr: 0, reason: "failed to open bus device" })?;
        Ok(Self { file, bus })
    }

    fn select(&self, address: u8) -> Result<(), C3Error> {
        // SAFETY: the fd is a valid, open character device for the lifetime of this call.
        unsafe { i2c_set_slave(self.file.as_raw_fd(), address as i32) }
            .map_err(|_| C3Error::I2c { bus: self.bus, addr: address, reason: "I2C_SLAVE ioctl failed" })?;
        Ok(())
    }
}

impl I2cBus for LinuxI2cBus {
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), C3Error> {
        self.select(address)?;
        self.file
            .write_all(data)
            .map_err(|_| C3Error::I2c { bus: self.bus, addr: address, reason: "write failed" })
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), C3Error> {
        self.select(address)?;
        self.file
            .read_exact(buf)
            .map_err(|_| C3Error::I2c { bus: self.bus, addr: address, reason: "read failed" })
    }

    fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> Result<(), C3Error> {
        self.write(address, data)?;
        self.read(address, buf)
    }
}
