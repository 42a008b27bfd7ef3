//! The known node fleet, varying by spacecraft generation (§6 `--oresat`).
//!
//! Card names, CAN node ids and OPD addresses are the daemon's own
//! configuration, not something any service derives at runtime — kept here
//! as one small table rather than threaded through `main.rs`.

use c3_core::node_manager::NodeRecord;
use c3_core::opd::ProcessorClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OresatVersion {
    V0,
    V0_5,
    V1,
}

impl OresatVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "0" => Some(OresatVersion::V0),
            "0.5" => Some(OresatVersion::V0_5),
            "1" => Some(OresatVersion::V1),
            _ => None,
        }
    }
}

/// The two always-on battery packs every generation carries (§3, §4.3:
/// `VBATT_BP1`/`VBATT_BP2` feed directly off these).
pub const BATTERY_NODE_NAMES: [&str; 2] = ["battery_1", "battery_2"];

/// Builds the node records for `version`. Every generation carries the two
/// battery packs, the solar controller and the GPS receiver; OreSat0 adds
/// the fluorescence camera payload, OreSat0.5 drops it for DxWiFi, and
/// OreSat1 adds dual star trackers and a reaction wheel board.
pub fn build(version: OresatVersion) -> Vec<NodeRecord> {
    let mut nodes = vec![
        NodeRecord::new("battery_1", 1, 0x18, ProcessorClass::Microcontroller).always_on(),
        NodeRecord::new("battery_2", 2, 0x19, ProcessorClass::Microcontroller).always_on(),
        NodeRecord::new("solar", 3, 0x1A, ProcessorClass::Microcontroller),
        NodeRecord::new("gps", 4, 0x1B, ProcessorClass::Microcontroller),
    ];

    match version {
        OresatVersion::V0 => {
            nodes.push(NodeRecord::new("cfc", 5, 0x1C, ProcessorClass::AppProcessor));
        }
        OresatVersion::V0_5 => {
            nodes.push(NodeRecord::new("dxwifi", 5, 0x1C, ProcessorClass::AppProcessor));
        }
        OresatVersion::V1 => {
            nodes.push(NodeRecord::new("dxwifi", 5, 0x1C, ProcessorClass::AppProcessor));
            nodes.push(NodeRecord::new("star_tracker_1", 6, 0x1D, ProcessorClass::AppProcessor));
            nodes.push(NodeRecord::new("star_tracker_2", 7, 0x1E, ProcessorClass::AppProcessor));
            nodes.push(NodeRecord::new("reaction_wheels", 8, 0x1F, ProcessorClass::Microcontroller));
        }
    }

    nodes
}
