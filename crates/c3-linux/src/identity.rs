//! Hardware identity readback (§6, §11.2): the 4-ASCII-character hardware
//! version stamped into an EEPROM at a fixed offset, and the 5-bit hardware
//! id formed from dedicated GPIO straps.

use c3_core::hal::{Gpio, I2cBus};
use c3_core::C3Error;

const HW_VERSION_EEPROM_OFFSET: usize = 12;
const HW_VERSION_LEN: usize = 4;

/// Reads the 4-ASCII-character hardware version from offset 12 of the
/// identity EEPROM at `address` (§6). `NNMM` is read back as `vNN.MM`,
/// matching the reference firmware's own formatting.
pub fn read_hw_version(bus: &mut dyn I2cBus, address: u8) -> Result<String, C3Error> {
    let mut buf = [0u8; HW_VERSION_LEN];
    bus.write_read(address, &[HW_VERSION_EEPROM_OFFSET as u8], &mut buf)?;
    let raw = std::str::from_utf8(&buf).map_err(|_| C3Error::I2c {
        bus: 0,
        addr: address,
        reason: "hardware version bytes are not valid ASCII",
    })?;
    if raw.len() != 4 {
        return Err(C3Error::I2c { bus: 0, addr: address, reason: "hardware version field short" });
    }
    Ok(format!("v{}.{}", &raw[0..2], &raw[2..4]))
}

/// Reads the bit-OR of the five `HW_ID_BIT_0..4` GPIO straps (§6). A pin
/// read failure is treated as a zero bit rather than a hard failure — the
/// reference firmware logs and continues rather than refusing to boot over
/// a missing identity strap.
pub fn read_hw_id(bits: &[&dyn Gpio; 5]) -> u8 {
    let mut hw_id = 0u8;
    for (i, bit) in bits.iter().enumerate() {
        if bit.is_high().unwrap_or(false) {
            hw_id |= 1 << i;
        }
    }
    hw_id
}

/// Whether the current process is running as root, and so can be expected
/// to hold `CAP_SYS_TIME` and the other privileges a system reset needs.
pub fn euid_is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockBus {
        eeprom: Vec<u8>,
    }

    impl I2cBus for MockBus {
        fn write(&mut self, _address: u8, _data: &[u8]) -> Result<(), C3Error> {
            Ok(())
        }
        fn read(&mut self, _address: u8, _buf: &mut [u8]) -> Result<(), C3Error> {
            Ok(())
        }
        fn write_read(&mut self, _address: u8, data: &[u8], buf: &mut [u8]) -> Result<(), C3Error> {
            let offset = data[0] as usize;
            buf.copy_from_slice(&self.eeprom[offset..offset + buf.len()]);
            Ok(())
        }
    }

    #[test]
    fn formats_hw_version_from_eeprom_bytes() {
        let mut eeprom = vec![0u8; 28];
        eeprom[12..16].copy_from_slice(b"0600");
        let mut bus = MockBus { eeprom };
        assert_eq!(read_hw_version(&mut bus, 0x50).unwrap(), "v06.00");
    }

    struct MockGpio(bool);
    impl Gpio for MockGpio {
        fn set_high(&mut self) -> Result<(), C3Error> {
            Ok(())
        }
        fn set_low(&mut self) -> Result<(), C3Error> {
            Ok(())
        }
        fn is_high(&self) -> Result<bool, C3Error> {
            Ok(self.0)
        }
    }

    #[test]
    fn hw_id_is_bit_or_of_straps() {
        let bits: [MockGpio; 5] = [MockGpio(true), MockGpio(false), MockGpio(true), MockGpio(false), MockGpio(false)];
        let refs: [&dyn Gpio; 5] = [&bits[0], &bits[1], &bits[2], &bits[3], &bits[4]];
        assert_eq!(read_hw_id(&refs), 0b0000_0101);
    }
}
