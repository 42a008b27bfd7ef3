//! Object Dictionary: a flat keyed store of typed entries shared by every
//! service.
//!
//! Structurally this keeps the teacher's `BTreeMap`-backed dictionary with
//! typed read/write and a persistence hook, simplified for a flat (no
//! array/record sub-indices, no PDO mapping) model: every entry has exactly
//! one (index, value) pair.

pub mod constants;
pub mod entry;
pub mod value;

pub use entry::{AccessType, ObjectEntry};
pub use value::ObjectValue;

use crate::error::C3Error;
use log::{trace, warn};
use std::collections::BTreeMap;

/// The shared flight-computer Object Dictionary.
pub struct ObjectDictionary {
    entries: BTreeMap<u16, ObjectEntry>,
}

impl ObjectDictionary {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, entry: ObjectEntry) {
        self.entries.insert(entry.index, entry);
    }

    pub fn read(&self, index: u16) -> Result<&ObjectValue, C3Error> {
        self.entries
            .get(&index)
            .map(|e| &e.value)
            .ok_or(C3Error::NoSuchEntry(index))
    }

    pub fn read_cloned(&self, index: u16) -> Result<ObjectValue, C3Error> {
        self.read(index).cloned()
    }

    pub fn read_u8(&self, index: u16) -> Result<u8, C3Error> {
        self.read(index)?.as_u8().ok_or(C3Error::TypeMismatch(index))
    }

    pub fn read_u16(&self, index: u16) -> Result<u16, C3Error> {
        self.read(index)?.as_u16().ok_or(C3Error::TypeMismatch(index))
    }

    pub fn read_u32(&self, index: u16) -> Result<u32, C3Error> {
        self.read(index)?.as_u32().ok_or(C3Error::TypeMismatch(index))
    }

    pub fn read_bool(&self, index: u16) -> Result<bool, C3Error> {
        self.read(index)?.as_bool().ok_or(C3Error::TypeMismatch(index))
    }

    /// Writes `value` into entry `index`, enforcing access rights, type
    /// compatibility with the existing value, and enum-label membership, then
    /// invoking any registered write callbacks.
    pub fn write(&mut self, index: u16, value: ObjectValue) -> Result<(), C3Error> {
        let entry = self
            .entries
            .get_mut(&index)
            .ok_or(C3Error::NoSuchEntry(index))?;

        if entry.access == AccessType::ReadOnly {
            return Err(C3Error::ReadOnly(index));
        }
        if std::mem::discriminant(&entry.value) != std::mem::discriminant(&value) {
            return Err(C3Error::TypeMismatch(index));
        }
        entry.validate(&value)?;

        entry.value = value;
        trace!("wrote OD entry {:#06x} ({})", index, entry.name);
        for cb in &entry.write_callbacks {
            cb(&entry.value);
        }
        Ok(())
    }

    /// Direct write bypassing access-type enforcement, for internal service
    /// use (e.g. the EDL service updating `EDL_LAST_TIMESTAMP`, the state
    /// machine restoring a persisted value at boot).
    pub fn write_internal(&mut self, index: u16, value: ObjectValue) -> Result<(), C3Error> {
        let entry = self
            .entries
            .get_mut(&index)
            .ok_or(C3Error::NoSuchEntry(index))?;
        if std::mem::discriminant(&entry.value) != std::mem::discriminant(&value) {
            return Err(C3Error::TypeMismatch(index));
        }
        entry.value = value;
        for cb in &entry.write_callbacks {
            cb(&entry.value);
        }
        Ok(())
    }

    /// Resets `index` to its declared default, used when a persisted value
    /// fails to decode into a valid enumerator (§4.7).
    pub fn restore_default(&mut self, index: u16) {
        if let Some(entry) = self.entries.get_mut(&index) {
            warn!("OD entry {:#06x} ({}) restored to default", index, entry.name);
            entry.value = entry.default_value.clone();
        }
    }

    /// Writes a value restored from persistent storage, falling back to the
    /// entry's default if it has the wrong type or fails enum-label
    /// validation — an empty/corrupt store must not wedge the entry (§4.7).
    pub fn write_internal_or_default(&mut self, index: u16, value: ObjectValue) -> Result<(), C3Error> {
        let entry = self.entries.get(&index).ok_or(C3Error::NoSuchEntry(index))?;
        let valid = std::mem::discriminant(&entry.value) == std::mem::discriminant(&value)
            && entry.validate(&value).is_ok();
        if valid {
            self.write_internal(index, value)
        } else {
            self.restore_default(index);
            Ok(())
        }
    }

    /// The persistent entry set, in declaration (insertion) order — the
    /// ordering the position-defined persistent layout relies on (§4.7).
    pub fn persistent_entries(&self) -> impl Iterator<Item = &ObjectEntry> {
        self.entries.values().filter(|e| e.persistent)
    }

    pub fn persistent_entries_mut(&mut self) -> impl Iterator<Item = &mut ObjectEntry> {
        self.entries.values_mut().filter(|e| e.persistent)
    }

    /// Attaches an extra write callback to an already-registered entry, for
    /// wiring cross-module side effects (e.g. `BEACON_SEND_NOW`) once the
    /// owning service has taken its own handle on the dictionary.
    pub fn add_write_callback(&mut self, index: u16, cb: impl Fn(&ObjectValue) + Send + 'static) -> Result<(), C3Error> {
        let entry = self.entries.get_mut(&index).ok_or(C3Error::NoSuchEntry(index))?;
        entry.write_callbacks.push(Box::new(cb));
        Ok(())
    }
}

impl Default for ObjectDictionary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn od_with_one_entry() -> ObjectDictionary {
        let mut od = ObjectDictionary::new();
        od.insert(ObjectEntry::new(
            0x3000,
            "STATUS",
            ObjectValue::U8(0),
            AccessType::ReadWrite,
        ));
        od
    }

    #[test]
    fn read_write_round_trip() {
        let mut od = od_with_one_entry();
        od.write(0x3000, ObjectValue::U8(3)).unwrap();
        assert_eq!(od.read_u8(0x3000).unwrap(), 3);
    }

    #[test]
    fn write_to_missing_entry_fails() {
        let mut od = ObjectDictionary::new();
        let err = od.write(0x9999, ObjectValue::U8(1)).unwrap_err();
        assert_eq!(err, C3Error::NoSuchEntry(0x9999));
    }

    #[test]
    fn write_to_readonly_fails() {
        let mut od = ObjectDictionary::new();
        od.insert(ObjectEntry::new(
            0x3400,
            "HW_VERSION",
            ObjectValue::VisibleString("v1.0".to_string()),
            AccessType::ReadOnly,
        ));
        let err = od
            .write(0x3400, ObjectValue::VisibleString("v2.0".to_string()))
            .unwrap_err();
        assert_eq!(err, C3Error::ReadOnly(0x3400));
    }

    #[test]
    fn write_wrong_type_fails() {
        let mut od = od_with_one_entry();
        let err = od.write(0x3000, ObjectValue::U32(1)).unwrap_err();
        assert_eq!(err, C3Error::TypeMismatch(0x3000));
    }

    #[test]
    fn enum_write_outside_label_set_fails() {
        let mut od = ObjectDictionary::new();
        const LABELS: entry::EnumLabels = &[(0, "PRE_DEPLOY"), (1, "DEPLOY")];
        od.insert(
            ObjectEntry::new(0x3000, "STATUS", ObjectValue::U8(0), AccessType::ReadWrite)
                .with_enum_labels(LABELS),
        );
        let err = od.write(0x3000, ObjectValue::U8(9)).unwrap_err();
        assert_eq!(err, C3Error::InvalidEnumValue(0x3000));
    }

    #[test]
    fn write_callback_fires_on_success() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let fired = Arc::new(AtomicBool::new(false));
        let fired_cb = fired.clone();
        let mut od = ObjectDictionary::new();
        od.insert(
            ObjectEntry::new(0x3202, "BEACON_SEND_NOW", ObjectValue::Bool(false), AccessType::ReadWrite)
                .with_write_callback(move |_| fired_cb.store(true, Ordering::SeqCst)),
        );
        od.write(0x3202, ObjectValue::Bool(true)).unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn persistent_entries_filters_by_flag() {
        let mut od = ObjectDictionary::new();
        od.insert(
            ObjectEntry::new(0x3000, "STATUS", ObjectValue::U8(0), AccessType::ReadWrite).persistent(),
        );
        od.insert(ObjectEntry::new(
            0x3400,
            "HW_VERSION",
            ObjectValue::VisibleString(String::new()),
            AccessType::ReadOnly,
        ));
        assert_eq!(od.persistent_entries().count(), 1);
    }
}
