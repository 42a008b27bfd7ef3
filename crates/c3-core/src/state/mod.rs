//! Mission state machine (§4.3): the top-level `{PRE_DEPLOY, DEPLOY,
//! STANDBY, BEACON, EDL}` FSM driven off OD inputs, plus antenna deployment
//! sequencing.
//!
//! Kept pure of I/O, the same separation the teacher draws between
//! `nmt/state_machine.rs` (transition logic) and the node that actually
//! drives the physical layer: `tick()` reads/writes the OD and returns a
//! list of [`Action`]s for the caller (the concrete state service, which
//! owns the antenna GPIOs and the reset/shutdown path) to carry out.

use crate::od::constants::*;
use crate::od::{AccessType, ObjectDictionary, ObjectEntry, ObjectValue};
use crate::error::C3Error;

const BAT_LEVEL_LOW_MV: u16 = 6500;

/// The mission's top-level operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionState {
    PreDeploy,
    Deploy,
    Standby,
    Beacon,
    Edl,
}

pub const STATUS_LABELS: crate::od::entry::EnumLabels = &[
    (0, "PRE_DEPLOY"),
    (1, "DEPLOY"),
    (2, "STANDBY"),
    (3, "BEACON"),
    (4, "EDL"),
];

impl MissionState {
    pub fn to_u8(self) -> u8 {
        match self {
            MissionState::PreDeploy => 0,
            MissionState::Deploy => 1,
            MissionState::Standby => 2,
            MissionState::Beacon => 3,
            MissionState::Edl => 4,
        }
    }

    /// Decodes a stored/requested code; any value outside the declared
    /// enumeration is treated as invalid (§7: "invalid mission state" falls
    /// back to `PRE_DEPLOY` at the caller).
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(MissionState::PreDeploy),
            1 => Some(MissionState::Deploy),
            2 => Some(MissionState::Standby),
            3 => Some(MissionState::Beacon),
            4 => Some(MissionState::Edl),
            _ => None,
        }
    }
}

/// `SYSTEM_RESET` request codes (§4.3, §7, §11.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    NoStop,
    SoftReset,
    HardReset,
    FactoryReset,
}

pub const SYSTEM_RESET_LABELS: crate::od::entry::EnumLabels = &[
    (0, "NO_STOP"),
    (1, "SOFT_RESET"),
    (2, "HARD_RESET"),
    (3, "FACTORY_RESET"),
];

impl ResetKind {
    pub fn to_u8(self) -> u8 {
        match self {
            ResetKind::NoStop => 0,
            ResetKind::SoftReset => 1,
            ResetKind::HardReset => 2,
            ResetKind::FactoryReset => 3,
        }
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(ResetKind::NoStop),
            1 => Some(ResetKind::SoftReset),
            2 => Some(ResetKind::HardReset),
            3 => Some(ResetKind::FactoryReset),
            _ => None,
        }
    }
}

/// A side effect `tick()` asks the caller to perform; kept out of the FSM
/// itself so the transition logic stays testable without a GPIO or a
/// watchdog socket (§8: FSM invariants are OD-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Pulse the monopole element, then the helical element, each held for
    /// `pulse_width_ms`, separated by `inter_deploy_delay_ms` (§4.3).
    FireAntennas {
        pulse_width_ms: u32,
        inter_deploy_delay_ms: u32,
    },
    /// `reset` was requested; the caller should ask the watchdog-petter
    /// collaborator to stop, falling back to a hard-reset OD flag (§4.3).
    Reset(ResetKind),
}

/// Registers every OD entry this module owns, with sane startup defaults.
/// Persistence of these entries (besides the always-volatile telemetry
/// readings) is a flag on the entry; `persistent.rs` decides *whether* to
/// write them this tick (skipped entirely in `PRE_DEPLOY`, §4.3).
pub fn register_entries(od: &mut ObjectDictionary) {
    od.insert(
        ObjectEntry::new(IDX_STATUS, "STATUS", ObjectValue::U8(MissionState::PreDeploy.to_u8()), AccessType::ReadWrite)
            .with_enum_labels(STATUS_LABELS)
            .persistent(),
    );
    od.insert(ObjectEntry::new(
        IDX_FLIGHT_MODE,
        "FLIGHT_MODE",
        ObjectValue::Bool(false),
        AccessType::ReadWrite,
    ));
    od.insert(
        ObjectEntry::new(IDX_TX_CONTROL_ENABLE, "TX_CONTROL_ENABLE", ObjectValue::Bool(true), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(
        ObjectEntry::new(IDX_TX_LAST_ENABLE_TIMESTAMP, "TX_LAST_ENABLE_TIMESTAMP", ObjectValue::U32(0), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(ObjectEntry::new(IDX_VBATT_BP1, "VBATT_BP1", ObjectValue::U16(0), AccessType::ReadOnly));
    od.insert(ObjectEntry::new(IDX_VBATT_BP2, "VBATT_BP2", ObjectValue::U16(0), AccessType::ReadOnly));
    od.insert(
        ObjectEntry::new(IDX_EDL_LAST_TIMESTAMP, "EDL_LAST_TIMESTAMP", ObjectValue::U32(0), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(
        ObjectEntry::new(IDX_DEPLOYED, "DEPLOYED", ObjectValue::Bool(false), AccessType::ReadWrite).persistent(),
    );
    od.insert(
        ObjectEntry::new(IDX_LAST_RESET_TIMESTAMP, "LAST_RESET_TIMESTAMP", ObjectValue::U32(0), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(
        ObjectEntry::new(IDX_SYSTEM_RESET, "SYSTEM_RESET", ObjectValue::U8(ResetKind::NoStop.to_u8()), AccessType::ReadWrite)
            .with_enum_labels(SYSTEM_RESET_LABELS),
    );
    od.insert(
        ObjectEntry::new(IDX_TX_CONTROL_TIMEOUT, "TX_CONTROL_TIMEOUT", ObjectValue::U32(5 * 60), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(
        ObjectEntry::new(IDX_EDL_TIMEOUT, "EDL_TIMEOUT", ObjectValue::U32(60), AccessType::ReadWrite).persistent(),
    );
    od.insert(
        ObjectEntry::new(IDX_RESET_TIMEOUT, "RESET_TIMEOUT", ObjectValue::U32(60 * 60), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(
        ObjectEntry::new(IDX_ANTENNAS_ATTEMPTS, "ANTENNAS_ATTEMPTS", ObjectValue::U8(0), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(
        ObjectEntry::new(IDX_ANTENNAS_MAX_ATTEMPTS, "ANTENNAS_MAX_ATTEMPTS", ObjectValue::U8(10), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(
        ObjectEntry::new(
            IDX_ANTENNAS_PRE_ATTEMPT_TIMEOUT,
            "ANTENNAS_PRE_ATTEMPT_TIMEOUT",
            ObjectValue::U32(45 * 60),
            AccessType::ReadWrite,
        )
        .persistent(),
    );
    od.insert(
        ObjectEntry::new(
            IDX_ANTENNAS_REATTEMPT_TIMEOUT,
            "ANTENNAS_REATTEMPT_TIMEOUT",
            ObjectValue::U32(60),
            AccessType::ReadWrite,
        )
        .persistent(),
    );
    od.insert(
        ObjectEntry::new(IDX_ANTENNAS_PULSE_WIDTH_MS, "ANTENNAS_PULSE_WIDTH_MS", ObjectValue::U32(500), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(
        ObjectEntry::new(
            IDX_ANTENNAS_INTER_DEPLOY_DELAY_MS,
            "ANTENNAS_INTER_DEPLOY_DELAY_MS",
            ObjectValue::U32(1000),
            AccessType::ReadWrite,
        )
        .persistent(),
    );
}

/// The pure transition logic, driven at 10 Hz by the concrete state service.
pub struct StateMachine {
    boot_monotonic_s: u32,
    last_deploy_attempt_s: u32,
    ticks: u64,
}

impl StateMachine {
    pub fn new(boot_monotonic_s: u32) -> Self {
        Self {
            boot_monotonic_s,
            last_deploy_attempt_s: boot_monotonic_s,
            ticks: 0,
        }
    }

    /// Whether this tick falls on the 1 Hz persistence cadence, and
    /// persistence is not suppressed by `PRE_DEPLOY` (§4.3).
    pub fn should_persist(&self, status: MissionState) -> bool {
        status != MissionState::PreDeploy && self.ticks % 10 == 0
    }

    /// Advances the FSM by one tick. `now_s` is a monotonically
    /// non-decreasing seconds counter shared by both the wall-clock
    /// timestamps stored in the OD and the boot-relative timers below — the
    /// caller is responsible for supplying a single consistent clock.
    pub fn tick(
        &mut self,
        od: &mut ObjectDictionary,
        now_s: u32,
        flight_mode: bool,
        euid_is_root: bool,
    ) -> Result<Vec<Action>, C3Error> {
        self.ticks += 1;

        let status = MissionState::from_u8(od.read_u8(IDX_STATUS)?).unwrap_or_else(|| {
            od.restore_default(IDX_STATUS);
            MissionState::PreDeploy
        });

        let tx_last_enable = od.read_u32(IDX_TX_LAST_ENABLE_TIMESTAMP)?;
        let tx_timeout = od.read_u32(IDX_TX_CONTROL_TIMEOUT)?;
        let edl_last = od.read_u32(IDX_EDL_LAST_TIMESTAMP)?;
        let edl_timeout = od.read_u32(IDX_EDL_TIMEOUT)?;
        let reset_timeout = od.read_u32(IDX_RESET_TIMEOUT)?;
        let vbatt_bp1 = od.read_u16(IDX_VBATT_BP1)?;
        let vbatt_bp2 = od.read_u16(IDX_VBATT_BP2)?;
        let deployed = od.read_bool(IDX_DEPLOYED)?;
        let attempts = od.read_u8(IDX_ANTENNAS_ATTEMPTS)?;
        let max_attempts = od.read_u8(IDX_ANTENNAS_MAX_ATTEMPTS)?;
        let pre_attempt_timeout = od.read_u32(IDX_ANTENNAS_PRE_ATTEMPT_TIMEOUT)?;
        let reattempt_timeout = od.read_u32(IDX_ANTENNAS_REATTEMPT_TIMEOUT)?;
        let pulse_width_ms = od.read_u32(IDX_ANTENNAS_PULSE_WIDTH_MS)?;
        let inter_deploy_delay_ms = od.read_u32(IDX_ANTENNAS_INTER_DEPLOY_DELAY_MS)?;

        let has_tx_timed_out = now_s.saturating_sub(tx_last_enable) > tx_timeout;
        let has_edl_timed_out = now_s.saturating_sub(edl_last) < edl_timeout;
        let is_bat_lvl_good = vbatt_bp1 > BAT_LEVEL_LOW_MV && vbatt_bp2 > BAT_LEVEL_LOW_MV;
        let has_reset_timed_out = flight_mode
            && euid_is_root
            && now_s.saturating_sub(self.boot_monotonic_s) > reset_timeout;

        let mut actions = Vec::new();
        let mut next = status;

        match status {
            MissionState::PreDeploy => {
                if now_s.saturating_sub(self.boot_monotonic_s) < pre_attempt_timeout {
                    od.write_internal(IDX_TX_CONTROL_ENABLE, ObjectValue::Bool(true))?;
                } else {
                    next = MissionState::Deploy;
                }
            }
            MissionState::Deploy => {
                if deployed || attempts >= max_attempts {
                    od.write_internal(IDX_DEPLOYED, ObjectValue::Bool(true))?;
                    next = MissionState::Standby;
                } else if is_bat_lvl_good && now_s.saturating_sub(self.last_deploy_attempt_s) > reattempt_timeout {
                    od.write_internal(IDX_ANTENNAS_ATTEMPTS, ObjectValue::U8(attempts + 1))?;
                    self.last_deploy_attempt_s = now_s;
                    actions.push(Action::FireAntennas { pulse_width_ms, inter_deploy_delay_ms });
                }
            }
            MissionState::Standby => {
                if has_edl_timed_out {
                    next = MissionState::Edl;
                } else if has_reset_timed_out {
                    actions.push(Action::Reset(ResetKind::SoftReset));
                } else if !has_tx_timed_out && is_bat_lvl_good {
                    next = MissionState::Beacon;
                }
            }
            MissionState::Beacon => {
                if has_edl_timed_out {
                    next = MissionState::Edl;
                } else if has_reset_timed_out {
                    actions.push(Action::Reset(ResetKind::SoftReset));
                } else if has_tx_timed_out || !is_bat_lvl_good {
                    next = MissionState::Standby;
                }
            }
            MissionState::Edl => {
                if !has_edl_timed_out && !has_tx_timed_out && is_bat_lvl_good {
                    next = MissionState::Beacon;
                } else if !has_edl_timed_out {
                    next = MissionState::Standby;
                }
            }
        }

        if next != status {
            od.write_internal(IDX_STATUS, ObjectValue::U8(next.to_u8()))?;
        }

        let requested = ResetKind::from_u8(od.read_u8(IDX_SYSTEM_RESET)?).unwrap_or(ResetKind::NoStop);
        if requested != ResetKind::NoStop {
            od.write_internal(IDX_SYSTEM_RESET, ObjectValue::U8(ResetKind::NoStop.to_u8()))?;
            od.write_internal(IDX_LAST_RESET_TIMESTAMP, ObjectValue::U32(now_s))?;
            actions.push(Action::Reset(requested));
        }

        Ok(actions)
    }
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
    fn pre_deploy_transitions_to_deploy_after_timeout() {
        let mut od = test_od();
        od.write_internal(IDX_ANTENNAS_PRE_ATTEMPT_TIMEOUT, ObjectValue::U32(100)).unwrap();
        let mut fsm = StateMachine::new(0);
        fsm.tick(&mut od, 200, false, false).unwrap();
        assert_eq!(MissionState::from_u8(od.read_u8(IDX_STATUS).unwrap()), Some(MissionState::Deploy));
    }

    #[test]
    fn standby_to_beacon_when_tx_enabled_and_batteries_good() {
        let mut od = test_od();
        od.write_internal(IDX_STATUS, ObjectValue::U8(MissionState::Standby.to_u8())).unwrap();
        od.write_internal(IDX_TX_CONTROL_ENABLE, ObjectValue::Bool(true)).unwrap();
        od.write_internal(IDX_TX_LAST_ENABLE_TIMESTAMP, ObjectValue::U32(100)).unwrap();
        od.write_internal(IDX_VBATT_BP1, ObjectValue::U16(6501)).unwrap();
        od.write_internal(IDX_VBATT_BP2, ObjectValue::U16(6501)).unwrap();
        od.write_internal(IDX_EDL_LAST_TIMESTAMP, ObjectValue::U32(0)).unwrap();

        let mut fsm = StateMachine::new(0);
        fsm.tick(&mut od, 100, false, false).unwrap();

        assert_eq!(MissionState::from_u8(od.read_u8(IDX_STATUS).unwrap()), Some(MissionState::Beacon));
    }

    #[test]
    fn beacon_drops_to_standby_on_bad_battery() {
        let mut od = test_od();
        od.write_internal(IDX_STATUS, ObjectValue::U8(MissionState::Beacon.to_u8())).unwrap();
        od.write_internal(IDX_TX_CONTROL_ENABLE, ObjectValue::Bool(true)).unwrap();
        od.write_internal(IDX_TX_LAST_ENABLE_TIMESTAMP, ObjectValue::U32(0)).unwrap();
        od.write_internal(IDX_VBATT_BP1, ObjectValue::U16(6000)).unwrap();
        od.write_internal(IDX_VBATT_BP2, ObjectValue::U16(6501)).unwrap();

        let mut fsm = StateMachine::new(0);
        fsm.tick(&mut od, 0, false, false).unwrap();

        assert_eq!(MissionState::from_u8(od.read_u8(IDX_STATUS).unwrap()), Some(MissionState::Standby));
    }

    #[test]
    fn invalid_system_reset_request_surfaces_as_action() {
        let mut od = test_od();
        od.write_internal(IDX_SYSTEM_RESET, ObjectValue::U8(ResetKind::SoftReset.to_u8())).unwrap();
        let mut fsm = StateMachine::new(0);
        let actions = fsm.tick(&mut od, 0, false, false).unwrap();
        assert!(actions.contains(&Action::Reset(ResetKind::SoftReset)));
        assert_eq!(ResetKind::from_u8(od.read_u8(IDX_SYSTEM_RESET).unwrap()), Some(ResetKind::NoStop));
    }

    #[test]
    fn persistence_cadence_skips_pre_deploy() {
        let fsm = StateMachine::new(0);
        assert!(!fsm.should_persist(MissionState::PreDeploy));
        assert!(fsm.should_persist(MissionState::Standby));
    }
}
