//! In-memory stand-ins for the hardware HAL traits, injected in place of
//! the real Linux drivers when the daemon is started with `--mock-hw`
//! (§6, §9: "mock hardware flag everywhere" → a driver trait with a real
//! and a mock implementation, constructed once and selected by CLI config).
//!
//! These are runtime stand-ins reachable from `main`, distinct from the
//! `#[cfg(test)]`-only mocks living next to each trait's unit tests.

use c3_core::hal::{Adc, Gpio, GpioExpander, I2cBus, NonVolatileStorage, Rtc};
use c3_core::C3Error;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A mock I2C bus: every expander/F-RAM register access lands in an
/// in-memory map keyed by (address, register-or-offset).
#[derive(Default, Clone)]
pub struct MockI2cBus {
    state: Arc<Mutex<BTreeMap<(u8, u8), u8>>>,
}

impl I2cBus for MockI2cBus {
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), C3Error> {
        let mut state = self.state.lock().unwrap();
        if data.len() < 2 {
            return Ok(());
        }
        for (i, byte) in data[1..].iter().enumerate() {
            state.insert((address, data[0].wrapping_add(i as u8)), *byte);
        }
        Ok(())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), C3Error> {
        let state = self.state.lock().unwrap();
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = *state.get(&(address, i as u8)).unwrap_or(&0);
        }
        Ok(())
    }

    fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> Result<(), C3Error> {
        let state = self.state.lock().unwrap();
        let base = data.first().copied().unwrap_or(0);
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = *state.get(&(address, base.wrapping_add(i as u8))).unwrap_or(&0);
        }
        Ok(())
    }
}

/// A mock MAX7310 bank: every address is present, with independent
/// input/output register state, so probe/enable/reset exercise the full
/// node health FSM without real hardware.
#[derive(Default)]
pub struct MockGpioExpander {
    outputs: BTreeMap<u8, u8>,
    present: BTreeMap<u8, bool>,
}

impl MockGpioExpander {
    /// Marks `address` absent, for exercising the NOT_FOUND path.
    pub fn mark_absent(&mut self, address: u8) {
        self.present.insert(address, false);
    }
}

impl GpioExpander for MockGpioExpander {
    fn configure(&mut self, _address: u8, _direction_mask: u8, _polarity_mask: u8) -> Result<(), C3Error> {
        Ok(())
    }

    fn set_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
        let current = self.outputs.get(&address).copied().unwrap_or(0);
        self.outputs.insert(address, current | (1 << pin));
        Ok(())
    }

    fn clear_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
        let current = self.outputs.get(&address).copied().unwrap_or(0);
        self.outputs.insert(address, current & !(1 << pin));
        Ok(())
    }

    fn read_inputs(&mut self, address: u8) -> Result<u8, C3Error> {
        // Not-fault (bit 2) reads high (no fault) unless the node was
        // explicitly pulsed into a fault state by a test harness.
        Ok(self.outputs.get(&address).copied().unwrap_or(0) | 0b0000_0100)
    }

    fn is_present(&mut self, address: u8) -> Result<bool, C3Error> {
        Ok(*self.present.get(&address).unwrap_or(&true))
    }
}

#[derive(Default)]
pub struct MockGpio {
    high: bool,
}

impl Gpio for MockGpio {
    fn set_high(&mut self) -> Result<(), C3Error> {
        self.high = true;
        Ok(())
    }
    fn set_low(&mut self) -> Result<(), C3Error> {
        self.high = false;
        Ok(())
    }
    fn is_high(&self) -> Result<bool, C3Error> {
        Ok(self.high)
    }
}

#[derive(Default)]
pub struct MockAdc {
    pub raw: u16,
}

impl Adc for MockAdc {
    fn read_raw(&mut self) -> Result<u16, C3Error> {
        Ok(self.raw)
    }
}

/// An in-memory RTC, seeded from the host's wall clock at construction so
/// `--mock-hw` runs still see a plausible time.
pub struct MockRtc {
    unix_time: u32,
}

impl Default for MockRtc {
    fn default() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self { unix_time: now }
    }
}

impl Rtc for MockRtc {
    fn unix_time(&self) -> Result<u32, C3Error> {
        Ok(self.unix_time)
    }
    fn set_unix_time(&mut self, seconds: u32) -> Result<(), C3Error> {
        self.unix_time = seconds;
        Ok(())
    }
}

/// A mock byte-addressable non-volatile store, backing `FramOdStorage` in
/// `--mock-hw` mode without a real F-RAM part on the bus.
#[derive(Default)]
pub struct MockNonVolatileStorage {
    bytes: Vec<u8>,
}

impl MockNonVolatileStorage {
    pub fn new(capacity: u32) -> Self {
        Self { bytes: vec![0u8; capacity as usize] }
    }
}

impl NonVolatileStorage for MockNonVolatileStorage {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), C3Error> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.bytes.len() {
            return Err(C3Error::Storage("mock store read out of range"));
        }
        buf.copy_from_slice(&self.bytes[start..end]);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), C3Error> {
        let start = offset as usize;
        let end = start + data.len();
        if end > self.bytes.len() {
            return Err(C3Error::Storage("mock store write out of range"));
        }
        self.bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn capacity(&self) -> u32 {
        self.bytes.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_i2c_bus_round_trips_a_register() {
        let mut bus = MockI2cBus::default();
        bus.write(0x50, &[0x03, 0xAB]).unwrap();
        let mut buf = [0u8; 1];
        bus.write_read(0x50, &[0x03], &mut buf).unwrap();
        assert_eq!(buf[0], 0xAB);
    }

    #[test]
    fn mock_expander_defaults_present_with_no_fault() {
        let mut expander = MockGpioExpander::default();
        assert!(expander.is_present(0x18).unwrap());
        assert_ne!(expander.read_inputs(0x18).unwrap() & 0b0000_0100, 0);
    }

    #[test]
    fn mock_non_volatile_storage_round_trips() {
        let mut store = MockNonVolatileStorage::new(64);
        store.write(4, &[1, 2, 3]).unwrap();
        let mut buf = [0u8; 3];
        store.read(4, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }
}
