//! MAX7310 I2C GPIO-expander driver: the register-level implementation of
//! `c3_core::hal::GpioExpander` underneath the power-domain controller
//! (§4.5, §6).
//!
//! Register map (all single-byte, §6): input (0x00), output (0x01),
//! polarity (0x02), configuration/direction (0x03), timeout (0x04).

use c3_core::hal::{GpioExpander, I2cBus};
use c3_core::C3Error;

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum Reg {
    Input = 0x00,
    Output = 0x01,
    Polarity = 0x02,
    Config = 0x03,
    Timeout = 0x04,
}

/// One MAX7310 expander bank, addressed per-transaction on a shared I2C bus
/// (§6: 7-bit addresses 0x18..0x23, one per power-domain node).
pub struct Max7310 {
    bus: Box<dyn I2cBus + Send>,
}

impl Max7310 {
    pub fn new(bus: Box<dyn I2cBus + Send>) -> Self {
        Self { bus }
    }

    fn read_reg(&mut self, address: u8, reg: Reg) -> Result<u8, C3Error> {
        let mut buf = [0u8; 1];
        self.bus.write_read(address, &[reg as u8], &mut buf)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, address: u8, reg: Reg, value: u8) -> Result<(), C3Error> {
        self.bus.write(address, &[reg as u8, value])
    }
}

impl GpioExpander for Max7310 {
    fn configure(&mut self, address: u8, direction_mask: u8, polarity_mask: u8) -> Result<(), C3Error> {
        self.write_reg(address, Reg::Config, direction_mask)?;
        self.write_reg(address, Reg::Polarity, polarity_mask)?;
        // The power-up timeout feature isn't used by this deployment; disable it.
        self.write_reg(address, Reg::Timeout, 0)
    }

    fn set_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
        let current = self.read_reg(address, Reg::Output)?;
        self.write_reg(address, Reg::Output, current | (1 << pin))
    }

    fn clear_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
        let current = self.read_reg(address, Reg::Output)?;
        self.write_reg(address, Reg::Output, current & !(1 << pin))
    }

    fn read_inputs(&mut self, address: u8) -> Result<u8, C3Error> {
        self.read_reg(address, Reg::Input)
    }

    fn is_present(&mut self, address: u8) -> Result<bool, C3Error> {
        Ok(self.read_reg(address, Reg::Input).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct MockBus {
        regs: BTreeMap<(u8, u8), u8>,
        present: bool,
    }

    impl I2cBus for MockBus {
        fn write(&mut self, address: u8, data: &[u8]) -> Result<(), C3Error> {
            if !self.present {
                return Err(C3Error::I2c { bus: 0, addr: address, reason: "nak" });
            }
            self.regs.insert((address, data[0]), data[1]);
            Ok(())
        }

        fn read(&mut self, _address: u8, _buf: &mut [u8]) -> Result<(), C3Error> {
            unimplemented!("Max7310 never calls bare read()")
        }

        fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> Result<(), C3Error> {
            if !self.present {
                return Err(C3Error::I2c { bus: 0, addr: address, reason: "nak" });
            }
            buf[0] = *self.regs.get(&(address, data[0])).unwrap_or(&0);
            Ok(())
        }
    }

    #[test]
    fn configure_writes_direction_and_polarity() {
        let mock = MockBus { regs: BTreeMap::new(), present: true };
        let mut expander = Max7310::new(Box::new(mock));
        expander.configure(0x18, 0b0000_0111, 0).unwrap();
        assert_eq!(expander.read_inputs(0x18).unwrap(), 0);
    }

    #[test]
    fn absent_expander_reports_not_present() {
        let mock = MockBus { regs: BTreeMap::new(), present: false };
        let mut expander = Max7310::new(Box::new(mock));
        assert!(!expander.is_present(0x18).unwrap());
    }

    #[test]
    fn set_pin_is_read_modify_write_and_leaves_other_pins_alone() {
        let mock = MockBus { regs: BTreeMap::new(), present: true };
        let mut expander = Max7310::new(Box::new(mock));
        expander.set_pin(0x18, 3).unwrap();
        expander.set_pin(0x18, 4).unwrap();
        expander.clear_pin(0x18, 3).unwrap();
        let output = expander.read_reg(0x18, Reg::Output).unwrap();
        assert_eq!(output, 0b0001_0000);
    }
}
