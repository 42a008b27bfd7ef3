//! Serializes access to a single I2C bus shared by several peripherals
//! (the power-domain expander bank, the F-RAM store, §5 resource policy:
//! "I2C transactions are strictly serialized per bus").

use c3_core::hal::I2cBus;
use c3_core::C3Error;
use std::sync::{Arc, Mutex};

pub struct SharedI2cBus<T: I2cBus> {
    inner: Arc<Mutex<T>>,
}

impl<T: I2cBus> SharedI2cBus<T> {
    pub fn new(bus: T) -> Self {
        Self { inner: Arc::new(Mutex::new(bus)) }
    }
}

impl<T: I2cBus> Clone for SharedI2cBus<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: I2cBus> I2cBus for SharedI2cBus<T> {
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), C3Error> {
        self.inner.lock().unwrap().write(address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), C3Error> {
        self.inner.lock().unwrap().read(address, buf)
    }

    fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> Result<(), C3Error> {
        self.inner.lock().unwrap().write_read(address, data, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingBus {
        writes: u32,
    }

    impl I2cBus for CountingBus {
        fn write(&mut self, _address: u8, _data: &[u8]) -> Result<(), C3Error> {
            self.writes += 1;
            Ok(())
        }
        fn read(&mut self, _address: u8, _buf: &mut [u8]) -> Result<(), C3Error> {
            Ok(())
        }
        fn write_read(&mut self, _address: u8, _data: &[u8], _buf: &mut [u8]) -> Result<(), C3Error> {
            Ok(())
        }
    }

    #[test]
    fn clones_share_the_same_underlying_bus() {
        let mut a = SharedI2cBus::new(CountingBus::default());
        let mut b = a.clone();
        a.write(0x18, &[1]).unwrap();
        b.write(0x50, &[2]).unwrap();
        assert_eq!(a.inner.lock().unwrap().writes, 2);
    }
}
