//! Persistent state: reflecting the OD's persistent entry set to and from
//! the non-volatile store, and the clear/factory-reset path (§4.7, §11.4).
//!
//! The position-defined, offset-based byte encoding lives inside the
//! platform's [`crate::hal::ObjectDictionaryStorage`] implementation (it
//! owns the raw F-RAM layout); this module only moves typed values across
//! that boundary in the persistent entry set's canonical order.

use crate::error::C3Error;
use crate::hal::{ObjectDictionaryStorage, Rtc};
use crate::od::constants::{IDX_EDL_CRYPTO_KEY_0, IDX_EDL_CRYPTO_KEY_1, IDX_EDL_CRYPTO_KEY_2, IDX_EDL_CRYPTO_KEY_3};
use crate::od::ObjectDictionary;
use std::collections::BTreeMap;

const CRYPTO_KEY_INDICES: [u16; 4] = [
    IDX_EDL_CRYPTO_KEY_0,
    IDX_EDL_CRYPTO_KEY_1,
    IDX_EDL_CRYPTO_KEY_2,
    IDX_EDL_CRYPTO_KEY_3,
];

/// Restores every persistent OD entry from the non-volatile store, called
/// once before any service starts. Entries missing from the store, or whose
/// stored value fails type/enum validation, fall back to their declared
/// default (§4.7, §7: "persistent store corruption").
pub fn restore_state(od: &mut ObjectDictionary, storage: &mut dyn ObjectDictionaryStorage) -> Result<(), C3Error> {
    let loaded = storage.load()?;
    let indices: Vec<u16> = od.persistent_entries().map(|e| e.index).collect();
    for index in indices {
        match loaded.get(&index) {
            Some(value) => od.write_internal_or_default(index, value.clone())?,
            None => od.restore_default(index),
        }
    }
    Ok(())
}

/// Writes every persistent OD entry back to the non-volatile store, in the
/// persistent entry set's canonical (index) order.
pub fn store_state(od: &ObjectDictionary, storage: &mut dyn ObjectDictionaryStorage) -> Result<(), C3Error> {
    let mut values = BTreeMap::new();
    for entry in od.persistent_entries() {
        values.insert(entry.index, entry.value.clone());
    }
    storage.save(&values)
}

/// Zeroes the persistent store, preserving the four crypto keys, then
/// resets every other persistent entry to its default and resets the RTC to
/// the epoch (§4.7, §11.4 — invoked by the main loop after a factory
/// reset's services have stopped cleanly).
pub fn clear_state(
    od: &mut ObjectDictionary,
    storage: &mut dyn ObjectDictionaryStorage,
    rtc: &mut dyn Rtc,
) -> Result<(), C3Error> {
    let preserved_keys: Vec<(u16, crate::od::ObjectValue)> = CRYPTO_KEY_INDICES
        .iter()
        .filter_map(|&index| od.read_cloned(index).ok().map(|v| (index, v)))
        .collect();

    storage.clear()?;

    let indices: Vec<u16> = od.persistent_entries().map(|e| e.index).collect();
    for index in indices {
        if !CRYPTO_KEY_INDICES.contains(&index) {
            od.restore_default(index);
        }
    }
    for (index, value) in preserved_keys {
        od.write_internal(index, value)?;
    }

    store_state(od, storage)?;
    rtc.set_unix_time(0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::od::{AccessType, ObjectEntry, ObjectValue};
    use std::collections::BTreeMap as Map;

    struct MockStorage {
        values: Map<u16, ObjectValue>,
    }

    impl ObjectDictionaryStorage for MockStorage {
        fn load(&mut self) -> Result<Map<u16, ObjectValue>, C3Error> {
            Ok(self.values.clone())
        }
        fn save(&mut self, values: &Map<u16, ObjectValue>) -> Result<(), C3Error> {
            self.values = values.clone();
            Ok(())
        }
        fn clear(&mut self) -> Result<(), C3Error> {
            self.values.clear();
            Ok(())
        }
    }

    struct MockRtc {
        unix: u32,
    }

    impl Rtc for MockRtc {
        fn unix_time(&self) -> Result<u32, C3Error> {
            Ok(self.unix)
        }
        fn set_unix_time(&mut self, seconds: u32) -> Result<(), C3Error> {
            self.unix = seconds;
            Ok(())
        }
    }

    fn test_od() -> ObjectDictionary {
        let mut od = ObjectDictionary::new();
        od.insert(ObjectEntry::new(0x3000, "STATUS", ObjectValue::U8(0), AccessType::ReadWrite).persistent());
        od.insert(ObjectEntry::new(0x3102, "KEY0", ObjectValue::Bytes(vec![0xAA; 32]), AccessType::ReadWrite).persistent());
        od
    }

    #[test]
    fn restore_falls_back_to_default_when_store_empty() {
        let mut od = test_od();
        od.write(0x3000, ObjectValue::U8(3)).unwrap();
        let mut storage = MockStorage { values: Map::new() };
        restore_state(&mut od, &mut storage).unwrap();
        assert_eq!(od.read_u8(0x3000).unwrap(), 0);
    }

    #[test]
    fn store_then_restore_round_trips() {
        let mut od = test_od();
        od.write(0x3000, ObjectValue::U8(2)).unwrap();
        let mut storage = MockStorage { values: Map::new() };
        store_state(&od, &mut storage).unwrap();

        let mut fresh = test_od();
        restore_state(&mut fresh, &mut storage).unwrap();
        assert_eq!(fresh.read_u8(0x3000).unwrap(), 2);
    }

    #[test]
    fn clear_state_preserves_crypto_key_and_resets_rtc() {
        let mut od = ObjectDictionary::new();
        od.insert(ObjectEntry::new(0x3000, "STATUS", ObjectValue::U8(0), AccessType::ReadWrite).persistent());
        od.insert(
            ObjectEntry::new(IDX_EDL_CRYPTO_KEY_0, "KEY0", ObjectValue::Bytes(vec![0u8; 32]), AccessType::ReadWrite)
                .persistent(),
        );
        od.write(IDX_EDL_CRYPTO_KEY_0, ObjectValue::Bytes(vec![0x42; 32])).unwrap();
        od.write(0x3000, ObjectValue::U8(3)).unwrap();

        let mut storage = MockStorage { values: Map::new() };
        let mut rtc = MockRtc { unix: 12345 };

        clear_state(&mut od, &mut storage, &mut rtc).unwrap();

        assert_eq!(od.read_u8(0x3000).unwrap(), 0);
        assert_eq!(od.read_cloned(IDX_EDL_CRYPTO_KEY_0).unwrap(), ObjectValue::Bytes(vec![0x42; 32]));
        assert_eq!(rtc.unix_time().unwrap(), 0);
    }
}
