//! EDL's Object Dictionary group: the replay-protection sequence counter,
//! the four crypto-key slots, which one is active, and the rejection
//! counter (§4.6, §4.7).

use crate::od::constants::*;
use crate::od::{AccessType, ObjectDictionary, ObjectEntry, ObjectValue};

use super::codec::EdlKey;

/// `EDL_ACTIVE_KEY_INDEX`'s default slot.
///
/// The reference firmware boots with slot 1 active rather than slot 0 —
/// slot 0 is reserved as a factory/recovery key that is never selected
/// automatically. Preserved here rather than "corrected" to 0.
pub const DEFAULT_ACTIVE_KEY_INDEX: u8 = 1;

const CRYPTO_KEY_INDICES: [u16; 4] = [
    IDX_EDL_CRYPTO_KEY_0,
    IDX_EDL_CRYPTO_KEY_1,
    IDX_EDL_CRYPTO_KEY_2,
    IDX_EDL_CRYPTO_KEY_3,
];

/// Registers the EDL OD group. The sequence number, active key index, and
/// all four key slots are persistent (§4.7); the rejected-frame counter is
/// volatile diagnostic state, reset every boot.
pub fn register_entries(od: &mut ObjectDictionary) {
    od.insert(
        ObjectEntry::new(IDX_EDL_SEQUENCE_NUMBER, "EDL_SEQUENCE_NUMBER", ObjectValue::U32(0), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(
        ObjectEntry::new(
            IDX_EDL_ACTIVE_KEY_INDEX,
            "EDL_ACTIVE_KEY_INDEX",
            ObjectValue::U8(DEFAULT_ACTIVE_KEY_INDEX),
            AccessType::ReadWrite,
        )
        .persistent(),
    );
    for (i, index) in CRYPTO_KEY_INDICES.iter().enumerate() {
        od.insert(
            ObjectEntry::new(
                *index,
                crypto_key_name(i),
                ObjectValue::Bytes(vec![0u8; 32]),
                AccessType::ReadWrite,
            )
            .persistent(),
        );
    }
    od.insert(ObjectEntry::new(
        IDX_EDL_REJECTED_COUNT,
        "EDL_REJECTED_COUNT",
        ObjectValue::U32(0),
        AccessType::ReadWrite,
    ));
}

fn crypto_key_name(i: usize) -> &'static str {
    match i {
        0 => "EDL_CRYPTO_KEY_0",
        1 => "EDL_CRYPTO_KEY_1",
        2 => "EDL_CRYPTO_KEY_2",
        _ => "EDL_CRYPTO_KEY_3",
    }
}

/// Reads the currently active 32-byte HMAC key out of the OD, following
/// `EDL_ACTIVE_KEY_INDEX` (§4.6).
pub fn active_key(od: &ObjectDictionary) -> Result<EdlKey, crate::error::C3Error> {
    let active = od.read_u8(IDX_EDL_ACTIVE_KEY_INDEX)? as usize;
    let index = *CRYPTO_KEY_INDICES
        .get(active)
        .ok_or(crate::error::C3Error::NoSuchEntry(IDX_EDL_ACTIVE_KEY_INDEX))?;
    let bytes = od
        .read(index)?
        .as_bytes()
        .ok_or(crate::error::C3Error::TypeMismatch(index))?;
    bytes.try_into().map_err(|_| crate::error::C3Error::TypeMismatch(index))
}

/// Increments the EDL sequence counter, wrapping at `u32::MAX` (§4.6).
pub fn advance_sequence(od: &mut ObjectDictionary) -> Result<(), crate::error::C3Error> {
    let current = od.read_u32(IDX_EDL_SEQUENCE_NUMBER)?;
    od.write_internal(IDX_EDL_SEQUENCE_NUMBER, ObjectValue::U32(current.wrapping_add(1)))
}

/// Increments the rejected-frame diagnostic counter, wrapping at `u32::MAX`.
pub fn record_rejected(od: &mut ObjectDictionary) -> Result<(), crate::error::C3Error> {
    let current = od.read_u32(IDX_EDL_REJECTED_COUNT)?;
    od.write_internal(IDX_EDL_REJECTED_COUNT, ObjectValue::U32(current.wrapping_add(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_od() -> ObjectDictionary {
        let mut od = ObjectDictionary::new();
        register_entries(&mut od);
        od
    }

    #[test]
    fn defaults_active_key_to_slot_one() {
        let od = test_od();
        assert_eq!(od.read_u8(IDX_EDL_ACTIVE_KEY_INDEX).unwrap(), 1);
    }

    #[test]
    fn active_key_reads_the_selected_slot() {
        let mut od = test_od();
        od.write_internal(IDX_EDL_CRYPTO_KEY_1, ObjectValue::Bytes(vec![0x42; 32])).unwrap();
        assert_eq!(active_key(&od).unwrap(), [0x42; 32]);
    }

    #[test]
    fn advance_sequence_wraps_at_max() {
        let mut od = test_od();
        od.write_internal(IDX_EDL_SEQUENCE_NUMBER, ObjectValue::U32(u32::MAX)).unwrap();
        advance_sequence(&mut od).unwrap();
        assert_eq!(od.read_u32(IDX_EDL_SEQUENCE_NUMBER).unwrap(), 0);
    }

    #[test]
    fn record_rejected_increments_counter() {
        let mut od = test_od();
        record_rejected(&mut od).unwrap();
        record_rejected(&mut od).unwrap();
        assert_eq!(od.read_u32(IDX_EDL_REJECTED_COUNT).unwrap(), 2);
    }
}
