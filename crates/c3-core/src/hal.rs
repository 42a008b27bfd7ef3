//! Hardware Abstraction Layer: the trait-per-concern boundary between core
//! logic and platform code, so the mission logic, EDL codec, beacon service
//! and node manager stay testable against mocks and portable across a real
//! Linux deployment target.

use crate::error::C3Error;
use crate::od::ObjectValue;
use std::collections::BTreeMap;

/// The three datagram endpoints the core exchanges with the radio subsystem
/// (§6): beacon-out, EDL-in, EDL-out. A single trait covers all three since
/// every implementation (UDP loopback in the real deployment, an in-memory
/// channel in tests) shares the same blocking-with-timeout shape.
pub trait NetworkInterface {
    /// Sends `data` as a single datagram.
    fn send(&mut self, data: &[u8]) -> Result<(), C3Error>;

    /// Blocks until a datagram arrives or the interface's configured timeout
    /// elapses. `Ok(0)` on timeout is the no-data convention; any other read
    /// failure is an `Err`.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, C3Error>;
}

/// Abstracts the non-volatile store backing the persistent entry set (§4.7).
/// Distinct from `NonVolatileStorage` below: this trait is keyed on OD index,
/// the unit the Object Dictionary layer operates in, while `NonVolatileStorage`
/// is the raw byte-addressable device underneath it (F-RAM on the real
/// platform).
pub trait ObjectDictionaryStorage {
    /// Loads every persisted entry by index.
    fn load(&mut self) -> Result<BTreeMap<u16, ObjectValue>, C3Error>;

    /// Persists every entry in `values`.
    fn save(&mut self, values: &BTreeMap<u16, ObjectValue>) -> Result<(), C3Error>;

    /// Zeroes the persisted region, preserving nothing (the crypto-key
    /// preservation called out in §4.7 is the caller's responsibility — it
    /// reads the keys out before calling `clear`, then writes them back).
    fn clear(&mut self) -> Result<(), C3Error>;
}

/// A byte-addressable, read/write, non-volatile device (F-RAM on the real
/// platform). `ObjectDictionaryStorage` implementations are built on top of
/// this rather than replacing it, mirroring the layering of offset-addressed
/// F-RAM drivers underneath a typed persistent-parameter store.
pub trait NonVolatileStorage {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), C3Error>;
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), C3Error>;
    fn capacity(&self) -> u32;
}

/// A single I2C bus, addressed per-transaction (not per-bus-handle) the way
/// Linux's `i2c-dev` exposes it.
pub trait I2cBus {
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), C3Error>;
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), C3Error>;
    fn write_read(&mut self, address: u8, data: &[u8], buf: &mut [u8]) -> Result<(), C3Error>;
}

/// A single GPIO line.
pub trait Gpio {
    fn set_high(&mut self) -> Result<(), C3Error>;
    fn set_low(&mut self) -> Result<(), C3Error>;
    fn is_high(&self) -> Result<bool, C3Error>;
}

/// A single ADC input channel, used to read battery bus currents/voltages.
pub trait Adc {
    fn read_raw(&mut self) -> Result<u16, C3Error>;
}

/// The hardware real-time clock.
pub trait Rtc {
    fn unix_time(&self) -> Result<u32, C3Error>;
    fn set_unix_time(&mut self, seconds: u32) -> Result<(), C3Error>;
}

/// A MAX7310-class I2C GPIO expander, one per power-domain node, addressed
/// by its 7-bit OPD address (0x18..0x23). Deliberately semantic rather than
/// register-shaped — which pins exist and what they mean is owned by
/// `node_manager`/`opd`, not by this trait; the register-level encoding
/// (input/output/polarity/config/timeout at 0x00..0x04) is a platform driver
/// concern this crate relies on only through these four operations.
pub trait GpioExpander {
    /// Sets pin direction (bit=1 input, bit=0 output) and input polarity
    /// inversion in one shot.
    fn configure(&mut self, address: u8, direction_mask: u8, polarity_mask: u8) -> Result<(), C3Error>;
    /// Sets a single output pin (`pin` 0..7), read-modify-write against the
    /// output register so other pins are left untouched.
    fn set_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error>;
    /// Clears a single output pin (`pin` 0..7), read-modify-write against the
    /// output register so other pins are left untouched.
    fn clear_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error>;
    /// Reads the expander's input-pin bank.
    fn read_inputs(&mut self, address: u8) -> Result<u8, C3Error>;
    /// Whether the expander at `address` acknowledges on the bus at all.
    fn is_present(&mut self, address: u8) -> Result<bool, C3Error>;
}
