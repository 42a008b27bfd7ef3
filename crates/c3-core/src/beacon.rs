//! Beacon packet assembly (§4.4): the pure, OD-driven half of the beacon
//! service — reading the configured body in order, framing it with AX.25,
//! and the entries the service schedules off.
//!
//! Kept separate from the datagram send, the same split `state`/`ax25`
//! draw between transition logic and physical I/O, so the framing is
//! testable against a fixed OD snapshot without a socket (§8 scenario 6).

use crate::ax25;
use crate::error::C3Error;
use crate::od::constants::*;
use crate::od::{AccessType, ObjectDictionary, ObjectEntry, ObjectValue};

/// Registers the OD entries the beacon service owns: the interval, the
/// last-send timestamp, the immediate-send trigger, and the two AX.25
/// callsigns (§4.4, §6).
pub fn register_entries(od: &mut ObjectDictionary) {
    od.insert(
        ObjectEntry::new(IDX_BEACON_DELAY, "BEACON_DELAY", ObjectValue::I32(10), AccessType::ReadWrite).persistent(),
    );
    od.insert(ObjectEntry::new(
        IDX_BEACON_LAST_TIMESTAMP,
        "BEACON_LAST_TIMESTAMP",
        ObjectValue::U32(0),
        AccessType::ReadOnly,
    ));
    od.insert(ObjectEntry::new(
        IDX_BEACON_SEND_NOW,
        "BEACON_SEND_NOW",
        ObjectValue::Bool(false),
        AccessType::ReadWrite,
    ));
    od.insert(
        ObjectEntry::new(
            IDX_BEACON_SRC_CALLSIGN,
            "BEACON_SRC_CALLSIGN",
            ObjectValue::VisibleString("ORESAT".to_string()),
            AccessType::ReadWrite,
        )
        .persistent(),
    );
    od.insert(
        ObjectEntry::new(
            IDX_BEACON_DEST_CALLSIGN,
            "BEACON_DEST_CALLSIGN",
            ObjectValue::VisibleString("ORESAT".to_string()),
            AccessType::ReadWrite,
        )
        .persistent(),
    );
}

fn callsign(od: &ObjectDictionary, index: u16) -> Result<String, C3Error> {
    match od.read(index)? {
        ObjectValue::VisibleString(s) => Ok(s.clone()),
        _ => Err(C3Error::TypeMismatch(index)),
    }
}

/// The ordered set of OD entries making up the beacon body, configured
/// once at startup from the mission's telemetry field list (§4.4).
pub struct BeaconBody {
    entries: Vec<u16>,
}

impl BeaconBody {
    pub fn new(entries: Vec<u16>) -> Self {
        Self { entries }
    }

    /// Captures a per-field snapshot of the body in declaration order,
    /// encodes each field, and frames the result with the AX.25 header and
    /// CRC-32 trailer (§4.4, §5: "a beacon captures a per-field snapshot in
    /// body order, not a global snapshot across all fields").
    pub fn assemble(&self, od: &ObjectDictionary) -> Result<Vec<u8>, C3Error> {
        let mut body = Vec::new();
        for index in &self.entries {
            body.extend_from_slice(&od.read(*index)?.serialize());
        }
        let src = callsign(od, IDX_BEACON_SRC_CALLSIGN)?;
        let dest = callsign(od, IDX_BEACON_DEST_CALLSIGN)?;
        ax25::pack(&dest, 0, &src, 0, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_od() -> ObjectDictionary {
        let mut od = ObjectDictionary::new();
        register_entries(&mut od);
        od.insert(ObjectEntry::new(0x4000, "TELEM_A", ObjectValue::U16(42), AccessType::ReadOnly));
        od.insert(ObjectEntry::new(0x4001, "TELEM_B", ObjectValue::U8(7), AccessType::ReadOnly));
        od
    }

    #[test]
    fn assembles_body_in_declared_order_with_ax25_framing() {
        let od = test_od();
        let body = BeaconBody::new(vec![0x4000, 0x4001]);
        let packet = body.assemble(&od).unwrap();
        // header (16) + 2 telemetry bytes + 1 byte + CRC32 (4)
        assert_eq!(packet.len(), 16 + 2 + 1 + 4);
        let unpacked = ax25::unpack(&packet).unwrap();
        assert_eq!(unpacked, vec![42, 0, 7]);
    }

    #[test]
    fn register_entries_sets_defaults() {
        let od = test_od();
        assert_eq!(od.read_cloned(IDX_BEACON_DELAY).unwrap(), ObjectValue::I32(10));
        assert_eq!(od.read_cloned(IDX_BEACON_SEND_NOW).unwrap(), ObjectValue::Bool(false));
    }
}
