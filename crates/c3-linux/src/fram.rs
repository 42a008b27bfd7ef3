//! F-RAM non-volatile storage (§4.7, §6, §11.4): a raw byte-addressable
//! driver for the FM24CL64B-class I2C F-RAM chip, and a position-defined
//! `ObjectDictionaryStorage` built on top of it.

use c3_core::hal::{I2cBus, NonVolatileStorage, ObjectDictionaryStorage};
use c3_core::od::ObjectValue;
use c3_core::C3Error;
use std::collections::BTreeMap;

const CAPACITY_BYTES: u32 = 8 * 1024;

/// The FM24CL64B addressing convention: a 2-byte little-endian offset
/// prefix precedes the data on every write, and precedes nothing (just the
/// device's internal read pointer) on a write-then-read.
pub struct Fm24Fram {
    bus: Box<dyn I2cBus + Send>,
    address: u8,
}

impl Fm24Fram {
    /// `address` must be an even value in 0x50..=0x5E, the FM24CL64B's
    /// 3-bit hardware address strapping range.
    pub fn new(bus: Box<dyn I2cBus + Send>, address: u8) -> Self {
        Self { bus, address }
    }
}

impl NonVolatileStorage for Fm24Fram {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), C3Error> {
        if offset + buf.len() as u32 > CAPACITY_BYTES {
            return Err(C3Error::Storage("read past F-RAM capacity"));
        }
        let offset_bytes = (offset as u16).to_le_bytes();
        self.bus.write_read(self.address, &offset_bytes, buf)
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), C3Error> {
        if offset + data.len() as u32 > CAPACITY_BYTES {
            return Err(C3Error::Storage("write past F-RAM capacity"));
        }
        let offset_bytes = (offset as u16).to_le_bytes();
        let mut payload = Vec::with_capacity(2 + data.len());
        payload.extend_from_slice(&offset_bytes);
        payload.extend_from_slice(data);
        self.bus.write(self.address, &payload)
    }

    fn capacity(&self) -> u32 {
        CAPACITY_BYTES
    }
}

/// Reflects the Object Dictionary's persistent entry set to and from raw
/// F-RAM bytes at fixed, position-defined offsets (§4.7: "no framing, no
/// length prefixes — the layout is implied by declaration order").
///
/// `schema` is supplied once at startup from `od.persistent_entries()` and
/// doubles as the type template `ObjectValue::deserialize` needs, since the
/// raw store carries no type tags of its own.
pub struct FramOdStorage {
    fram: Box<dyn NonVolatileStorage + Send>,
    schema: Vec<(u16, ObjectValue)>,
}

impl FramOdStorage {
    pub fn new(fram: Box<dyn NonVolatileStorage + Send>, schema: Vec<(u16, ObjectValue)>) -> Self {
        Self { fram, schema }
    }
}

impl ObjectDictionaryStorage for FramOdStorage {
    fn load(&mut self) -> Result<BTreeMap<u16, ObjectValue>, C3Error> {
        let mut offset = 0u32;
        let mut values = BTreeMap::new();
        for (index, template) in self.schema.clone() {
            let len = template.encoded_len();
            let mut buf = vec![0u8; len];
            if self.fram.read(offset, &mut buf).is_ok() {
                if let Ok(value) = ObjectValue::deserialize(&buf, &template, index) {
                    values.insert(index, value);
                }
            }
            offset += len as u32;
        }
        Ok(values)
    }

    fn save(&mut self, values: &BTreeMap<u16, ObjectValue>) -> Result<(), C3Error> {
        let mut offset = 0u32;
        for (index, template) in self.schema.clone() {
            let len = template.encoded_len();
            if let Some(value) = values.get(&index) {
                let bytes = value.serialize();
                if bytes.len() == len {
                    self.fram.write(offset, &bytes)?;
                }
            }
            offset += len as u32;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), C3Error> {
        let total: u32 = self.schema.iter().map(|(_, t)| t.encoded_len() as u32).sum();
        let zeros = vec![0u8; total as usize];
        self.fram.write(0, &zeros)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockFram {
        bytes: Vec<u8>,
    }

    impl NonVolatileStorage for MockFram {
        fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), C3Error> {
            let start = offset as usize;
            buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
            Ok(())
        }
        fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), C3Error> {
            let start = offset as usize;
            self.bytes[start..start + data.len()].copy_from_slice(data);
            Ok(())
        }
        fn capacity(&self) -> u32 {
            self.bytes.len() as u32
        }
    }

    fn schema() -> Vec<(u16, ObjectValue)> {
        vec![
            (0x3000, ObjectValue::U8(0)),
            (0x3102, ObjectValue::Bytes(vec![0u8; 4])),
            (0x3200, ObjectValue::U32(0)),
        ]
    }

    #[test]
    fn save_then_load_round_trips_at_position_defined_offsets() {
        let mock = MockFram { bytes: vec![0u8; 64] };
        let mut storage = FramOdStorage::new(Box::new(mock), schema());

        let mut values = BTreeMap::new();
        values.insert(0x3000, ObjectValue::U8(7));
        values.insert(0x3102, ObjectValue::Bytes(vec![1, 2, 3, 4]));
        values.insert(0x3200, ObjectValue::U32(99_999));
        storage.save(&values).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.get(&0x3000), Some(&ObjectValue::U8(7)));
        assert_eq!(loaded.get(&0x3102), Some(&ObjectValue::Bytes(vec![1, 2, 3, 4])));
        assert_eq!(loaded.get(&0x3200), Some(&ObjectValue::U32(99_999)));
    }

    #[test]
    fn clear_zeroes_the_backing_store() {
        let mock = MockFram { bytes: vec![0xFFu8; 64] };
        let mut storage = FramOdStorage::new(Box::new(mock), schema());
        storage.clear().unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(loaded.get(&0x3000), Some(&ObjectValue::U8(0)));
    }
}
