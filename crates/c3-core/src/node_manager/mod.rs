//! Power-domain node manager: per-node health FSM, reactive recovery
//! policy, and subsystem-level self-healing on top of [`crate::opd::Opd`]
//! (§4.5, §11.1).

use crate::error::C3Error;
use crate::log::{c3_warn, LogContext};
use crate::od::constants::*;
use crate::od::{AccessType, ObjectDictionary, ObjectEntry, ObjectValue};
use crate::opd::{Opd, ProcessorClass};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

fn ctx(node: &'static str) -> LogContext {
    LogContext { service: "node_manager", node: Some(node) }
}

const MAX_CO_RESETS: u8 = 3;
const RESET_TIMEOUT_S: u32 = 5;
const RESET_ATTEMPTS: u8 = 3;
const PROBE_INTERVAL_S: u32 = 10;
const EMERGENCY_QUEUE_CAP: usize = 16;

/// A node's derived health status (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    NotFound,
    Off,
    Boot,
    On,
    Error,
    Bootloader,
    Dead,
}

impl NodeStatus {
    /// Numeric encoding for `NODE_STATUS`/`OPD_STATUS` EDL command responses.
    pub fn to_u8(self) -> u8 {
        match self {
            NodeStatus::NotFound => 0,
            NodeStatus::Off => 1,
            NodeStatus::Boot => 2,
            NodeStatus::On => 3,
            NodeStatus::Error => 4,
            NodeStatus::Bootloader => 5,
            NodeStatus::Dead => 6,
        }
    }
}

/// One CANopen emergency message, queued for later inspection.
#[derive(Debug, Clone)]
pub struct EmergencyMessage {
    pub code: u16,
    pub timestamp_s: u32,
}

/// A known peripheral card (§3).
pub struct NodeRecord {
    pub name: &'static str,
    pub can_node_id: u8,
    pub opd_addr: u8,
    pub processor_class: ProcessorClass,
    pub child: Option<&'static str>,
    pub always_on: bool,
    pub status: NodeStatus,
    pub opd_resets: u8,
    pub last_enable_s: u32,
    pub last_heartbeat_s: u32,
    pub last_can_state: Option<u8>,
    pub emergencies: VecDeque<EmergencyMessage>,
    enabled_on_expander: bool,
}

impl NodeRecord {
    pub fn new(name: &'static str, can_node_id: u8, opd_addr: u8, processor_class: ProcessorClass) -> Self {
        Self {
            name,
            can_node_id,
            opd_addr,
            processor_class,
            child: None,
            always_on: false,
            status: NodeStatus::NotFound,
            opd_resets: 0,
            last_enable_s: 0,
            last_heartbeat_s: 0,
            last_can_state: None,
            emergencies: VecDeque::new(),
            enabled_on_expander: false,
        }
    }

    pub fn always_on(mut self) -> Self {
        self.always_on = true;
        self
    }

    pub fn with_child(mut self, child: &'static str) -> Self {
        self.child = Some(child);
        self
    }

    pub fn on_power_bus(&self) -> bool {
        self.opd_addr != 0
    }

    pub fn push_emergency(&mut self, msg: EmergencyMessage) {
        if self.emergencies.len() >= EMERGENCY_QUEUE_CAP {
            self.emergencies.pop_front();
        }
        self.emergencies.push_back(msg);
    }

    pub fn record_heartbeat(&mut self, now_s: u32, can_state: u8) {
        self.last_heartbeat_s = now_s;
        self.last_can_state = Some(can_state);
    }
}

/// Owns the full node fleet plus the shared power-domain controller.
pub struct NodeManager {
    nodes: BTreeMap<&'static str, NodeRecord>,
    opd: Opd,
    battery_node_names: Vec<&'static str>,
    uart_holder: Option<&'static str>,
    flight_mode: bool,
}

impl NodeManager {
    pub fn new(opd: Opd, battery_node_names: Vec<&'static str>, flight_mode: bool) -> Self {
        Self {
            nodes: BTreeMap::new(),
            opd,
            battery_node_names,
            uart_holder: None,
            flight_mode,
        }
    }

    pub fn add_node(&mut self, record: NodeRecord) {
        self.nodes.insert(record.name, record);
    }

    pub fn node(&self, name: &'static str) -> Result<&NodeRecord, C3Error> {
        self.nodes.get(name).ok_or(C3Error::NoSuchNode(name))
    }

    pub fn node_by_addr(&self, addr: u8) -> Result<&NodeRecord, C3Error> {
        self.nodes
            .values()
            .find(|n| n.opd_addr == addr)
            .ok_or(C3Error::NoSuchOpdAddress(addr))
    }

    pub fn name_by_can_id(&self, can_node_id: u8) -> Result<&'static str, C3Error> {
        self.nodes
            .values()
            .find(|n| n.can_node_id == can_node_id)
            .map(|n| n.name)
            .ok_or(C3Error::NoSuchNode("<unknown CAN node id>"))
    }

    pub fn is_subsystem_enabled(&self) -> bool {
        self.opd.is_subsystem_enabled()
    }

    /// Pulses a single node's circuit-breaker reset pin on request, mirroring
    /// the recovery branch `tick()` takes for nodes it finds in `Error`.
    pub fn reset_by_name(&mut self, name: &'static str, attempts: u8, sleep: impl Fn(Duration)) -> Result<bool, C3Error> {
        let addr = self.nodes.get(name).ok_or(C3Error::NoSuchNode(name))?.opd_addr;
        let cleared = self.opd.reset(addr, attempts, sleep)?;
        let node = self.nodes.get_mut(name).unwrap();
        node.opd_resets += 1;
        if cleared {
            node.status = NodeStatus::Boot;
        }
        Ok(cleared)
    }

    pub fn enable_bus(&mut self) -> Result<(), C3Error> {
        self.opd.enable_bus()
    }

    pub fn disable_bus(&mut self) -> Result<(), C3Error> {
        self.opd.disable_bus()
    }

    /// Probes every known power-domain address; returns the count found.
    /// After a scan, battery nodes are auto-enabled (§4.5).
    pub fn scan(&mut self) -> Result<u8, C3Error> {
        let mut found = 0u8;
        let addrs: Vec<(&'static str, u8, ProcessorClass)> = self
            .nodes
            .values()
            .filter(|n| n.on_power_bus())
            .map(|n| (n.name, n.opd_addr, n.processor_class))
            .collect();
        for (name, addr, class) in addrs {
            let present = self.opd.probe(addr, class)?;
            if let Some(node) = self.nodes.get_mut(name) {
                node.status = if present { NodeStatus::Off } else { NodeStatus::NotFound };
            }
            if present {
                found += 1;
            }
        }
        let battery_nodes = self.battery_node_names.clone();
        for name in battery_nodes {
            self.enable_by_name(name)?;
        }
        Ok(found)
    }

    pub fn probe_by_name(&mut self, name: &'static str) -> Result<bool, C3Error> {
        let (addr, class) = {
            let node = self.nodes.get(name).ok_or(C3Error::NoSuchNode(name))?;
            (node.opd_addr, node.processor_class)
        };
        let present = self.opd.probe(addr, class)?;
        let node = self.nodes.get_mut(name).unwrap();
        node.status = if present { NodeStatus::Off } else { NodeStatus::NotFound };
        Ok(present)
    }

    pub fn enable_by_name(&mut self, name: &'static str) -> Result<(), C3Error> {
        self.enable_by_name_mode(name, false)
    }

    pub fn enable_by_name_mode(&mut self, name: &'static str, bootloader_mode: bool) -> Result<(), C3Error> {
        let (addr, class) = {
            let node = self.nodes.get(name).ok_or(C3Error::NoSuchNode(name))?;
            (node.opd_addr, node.processor_class)
        };
        self.opd.enable(addr, class, bootloader_mode)?;
        let node = self.nodes.get_mut(name).unwrap();
        node.enabled_on_expander = true;
        node.status = NodeStatus::Boot;
        Ok(())
    }

    pub fn disable_by_name(&mut self, name: &'static str) -> Result<(), C3Error> {
        let addr = self.nodes.get(name).ok_or(C3Error::NoSuchNode(name))?.opd_addr;
        self.opd.disable(addr)?;
        let node = self.nodes.get_mut(name).unwrap();
        node.enabled_on_expander = false;
        node.status = NodeStatus::Off;
        Ok(())
    }

    /// Routes the shared debug UART to `name`, clearing it on whichever node
    /// previously held it (§11.5: the route is exclusive).
    pub fn route_uart(&mut self, name: &'static str) -> Result<(), C3Error> {
        if let Some(prev) = self.uart_holder {
            if prev != name {
                let addr = self.nodes.get(prev).map(|n| n.opd_addr);
                if let Some(addr) = addr {
                    self.opd.uart_select(addr, false)?;
                }
            }
        }
        let addr = self.nodes.get(name).ok_or(C3Error::NoSuchNode(name))?.opd_addr;
        self.opd.uart_select(addr, true)?;
        self.uart_holder = Some(name);
        Ok(())
    }

    /// Evaluates the per-node health FSM and runs the reactive recovery
    /// policy, once per 1 Hz tick (§4.5). `now_s` is the shared clock; `tick`
    /// is this call's sequence number, used for the 10 s probe cadence.
    pub fn tick(&mut self, now_s: u32, tick: u64, sleep: impl Fn(Duration) + Copy) -> Result<(), C3Error> {
        self.monitor_battery_nodes(sleep)?;

        let bus_enabled = self.opd.is_subsystem_enabled();
        let bus_dead = self.opd.is_subsystem_dead();

        let names: Vec<&'static str> = self.nodes.keys().copied().collect();
        for name in names {
            self.evaluate_health(name, now_s, bus_enabled, bus_dead)?;
        }

        if tick % PROBE_INTERVAL_S as u64 == 0 {
            let not_found: Vec<&'static str> = self
                .nodes
                .values()
                .filter(|n| n.on_power_bus() && n.status == NodeStatus::NotFound)
                .map(|n| n.name)
                .collect();
            for name in not_found {
                self.probe_by_name(name)?;
            }
        }

        let always_on_off: Vec<&'static str> = self
            .nodes
            .values()
            .filter(|n| n.always_on && n.status == NodeStatus::Off)
            .map(|n| n.name)
            .collect();
        for name in always_on_off {
            self.enable_by_name(name)?;
        }

        let dead_still_enabled: Vec<&'static str> = self
            .nodes
            .values()
            .filter(|n| n.status == NodeStatus::Dead && n.enabled_on_expander)
            .map(|n| n.name)
            .collect();
        for name in dead_still_enabled {
            self.disable_by_name(name)?;
        }

        let errored: Vec<&'static str> = self
            .nodes
            .values()
            .filter(|n| n.status == NodeStatus::Error)
            .map(|n| n.name)
            .collect();
        for name in errored {
            let addr = self.nodes.get(name).unwrap().opd_addr;
            let cleared = self.opd.reset(addr, RESET_ATTEMPTS, sleep)?;
            let node = self.nodes.get_mut(name).unwrap();
            node.opd_resets += 1;
            node.last_enable_s = now_s;
            if cleared {
                node.status = NodeStatus::Boot;
            }
        }

        for node in self.nodes.values_mut() {
            if node.status == NodeStatus::On || node.status == NodeStatus::Off {
                node.opd_resets = 0;
            }
        }

        Ok(())
    }

    fn evaluate_health(&mut self, name: &'static str, now_s: u32, bus_enabled: bool, bus_dead: bool) -> Result<(), C3Error> {
        let on_power_bus = self.nodes.get(name).unwrap().on_power_bus();
        if !on_power_bus {
            // Off-bus (CAN-only) nodes: heartbeat freshness is the sole signal.
            let node = self.nodes.get_mut(name).unwrap();
            node.status = if now_s.saturating_sub(node.last_heartbeat_s) <= RESET_TIMEOUT_S {
                NodeStatus::On
            } else {
                NodeStatus::Error
            };
            return Ok(());
        }

        if !bus_enabled {
            self.nodes.get_mut(name).unwrap().status = NodeStatus::NotFound;
            return Ok(());
        }
        if bus_dead {
            if self.nodes.get(name).unwrap().status != NodeStatus::Dead {
                c3_warn!(ctx(name), "power bus dead, marking node dead");
            }
            self.nodes.get_mut(name).unwrap().status = NodeStatus::Dead;
            return Ok(());
        }

        let addr = self.nodes.get(name).unwrap().opd_addr;
        let prior = self.nodes.get(name).unwrap().status;

        if prior == NodeStatus::Dead {
            let last_hb = self.nodes.get(name).unwrap().last_heartbeat_s;
            if now_s.saturating_sub(last_hb) > RESET_TIMEOUT_S {
                self.nodes.get_mut(name).unwrap().status = NodeStatus::On;
                return Ok(());
            }
        }

        if self.nodes.get(name).unwrap().opd_resets >= MAX_CO_RESETS {
            self.nodes.get_mut(name).unwrap().status = NodeStatus::Dead;
            return Ok(());
        }

        let class = self.nodes.get(name).unwrap().processor_class;
        if !self.opd.probe(addr, class)? {
            self.nodes.get_mut(name).unwrap().status = NodeStatus::NotFound;
            return Ok(());
        }

        if !self.opd.not_fault(addr)? {
            self.nodes.get_mut(name).unwrap().status = NodeStatus::Error;
            return Ok(());
        }

        let node = self.nodes.get(name).unwrap();
        if !node.enabled_on_expander {
            self.nodes.get_mut(name).unwrap().status = NodeStatus::Off;
            return Ok(());
        }

        let node = self.nodes.get(name).unwrap();
        let boot_timeout = node.processor_class.boot_timeout_s();
        let within_boot = now_s.saturating_sub(node.last_enable_s) <= boot_timeout;
        let heartbeat_stale = now_s.saturating_sub(node.last_heartbeat_s) > RESET_TIMEOUT_S;

        let next = if within_boot {
            if heartbeat_stale {
                NodeStatus::Boot
            } else {
                NodeStatus::On
            }
        } else if self.flight_mode && bus_enabled && heartbeat_stale {
            NodeStatus::Error
        } else if heartbeat_stale {
            prior
        } else {
            NodeStatus::On
        };

        self.nodes.get_mut(name).unwrap().status = next;
        Ok(())
    }

    /// Subsystem self-healing (§11.1): if a battery node that was alive goes
    /// `DEAD`, reset the whole power bus; after `MAX_SUBSYSTEM_RESETS`
    /// attempts with no recovery, `Opd::reset_bus` marks it permanently dead.
    fn monitor_battery_nodes(&mut self, sleep: impl Fn(Duration)) -> Result<(), C3Error> {
        let any_battery_dead = self
            .battery_node_names
            .iter()
            .filter_map(|n| self.nodes.get(*n))
            .any(|n| n.status == NodeStatus::Dead);
        if any_battery_dead && !self.opd.is_subsystem_dead() {
            self.opd.reset_bus(sleep)?;
            self.scan()?;
        } else if !any_battery_dead {
            self.opd.clear_subsystem_resets();
        }
        Ok(())
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes_off_count(&self) -> usize {
        self.count(NodeStatus::Off)
    }

    pub fn nodes_booting_count(&self) -> usize {
        self.count(NodeStatus::Boot)
    }

    pub fn nodes_on_count(&self) -> usize {
        self.count(NodeStatus::On)
    }

    pub fn nodes_error_count(&self) -> usize {
        self.count(NodeStatus::Error)
    }

    pub fn nodes_not_found_count(&self) -> usize {
        self.count(NodeStatus::NotFound)
    }

    pub fn nodes_dead_count(&self) -> usize {
        self.count(NodeStatus::Dead)
    }

    /// Preserved literally from the reference implementation's
    /// `are_any_nodes_dead`, which actually tests the **ON** count rather
    /// than the DEAD count (§9 Open Question resolution — kept for
    /// diagnostic parity, not fixed, alongside the correctly named
    /// `nodes_dead_count` above).
    pub fn nodes_reporting_on_count(&self) -> usize {
        self.count(NodeStatus::On)
    }

    fn count(&self, status: NodeStatus) -> usize {
        self.nodes.values().filter(|n| n.status == status).count()
    }

    /// Writes the aggregate counts back into the OD (§4.5 telemetry).
    pub fn reflect_counts(&self, od: &mut ObjectDictionary) -> Result<(), C3Error> {
        od.write_internal(IDX_NODE_MANAGER_TOTAL_NODES, ObjectValue::U8(self.total_nodes() as u8))?;
        od.write_internal(IDX_NODE_MANAGER_NODES_OFF, ObjectValue::U8(self.nodes_off_count() as u8))?;
        od.write_internal(IDX_NODE_MANAGER_NODES_BOOTING, ObjectValue::U8(self.nodes_booting_count() as u8))?;
        od.write_internal(IDX_NODE_MANAGER_NODES_ON, ObjectValue::U8(self.nodes_on_count() as u8))?;
        od.write_internal(IDX_NODE_MANAGER_NODES_WITH_ERRORS, ObjectValue::U8(self.nodes_error_count() as u8))?;
        od.write_internal(IDX_NODE_MANAGER_NODES_NOT_FOUND, ObjectValue::U8(self.nodes_not_found_count() as u8))?;
        od.write_internal(IDX_NODE_MANAGER_NODES_DEAD, ObjectValue::U8(self.nodes_dead_count() as u8))?;
        Ok(())
    }
}

pub fn register_entries(od: &mut ObjectDictionary) {
    od.insert(
        ObjectEntry::new(IDX_OPD_SYSENABLE, "OPD_SYSENABLE", ObjectValue::Bool(false), AccessType::ReadWrite)
            .persistent(),
    );
    od.insert(ObjectEntry::new(
        IDX_OPD_UART_NODE_SELECT,
        "OPD_UART_NODE_SELECT",
        ObjectValue::U8(0),
        AccessType::ReadWrite,
    ));
    od.insert(ObjectEntry::new(IDX_NODE_MANAGER_TOTAL_NODES, "NODE_MANAGER_TOTAL_NODES", ObjectValue::U8(0), AccessType::ReadOnly));
    od.insert(ObjectEntry::new(IDX_NODE_MANAGER_NODES_OFF, "NODE_MANAGER_NODES_OFF", ObjectValue::U8(0), AccessType::ReadOnly));
    od.insert(ObjectEntry::new(IDX_NODE_MANAGER_NODES_BOOTING, "NODE_MANAGER_NODES_BOOTING", ObjectValue::U8(0), AccessType::ReadOnly));
    od.insert(ObjectEntry::new(IDX_NODE_MANAGER_NODES_ON, "NODE_MANAGER_NODES_ON", ObjectValue::U8(0), AccessType::ReadOnly));
    od.insert(ObjectEntry::new(IDX_NODE_MANAGER_NODES_WITH_ERRORS, "NODE_MANAGER_NODES_WITH_ERRORS", ObjectValue::U8(0), AccessType::ReadOnly));
    od.insert(ObjectEntry::new(IDX_NODE_MANAGER_NODES_NOT_FOUND, "NODE_MANAGER_NODES_NOT_FOUND", ObjectValue::U8(0), AccessType::ReadOnly));
    od.insert(ObjectEntry::new(IDX_NODE_MANAGER_NODES_DEAD, "NODE_MANAGER_NODES_DEAD", ObjectValue::U8(0), AccessType::ReadOnly));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opd::mock::{MockAdc, MockExpander, MockGpio};
    use std::sync::{Arc, Mutex};

    struct SharedExpander(Arc<Mutex<MockExpander>>);
    impl crate::hal::GpioExpander for SharedExpander {
        fn configure(&mut self, address: u8, direction_mask: u8, polarity_mask: u8) -> Result<(), C3Error> {
            self.0.lock().unwrap().configure(address, direction_mask, polarity_mask)
        }
        fn set_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
            self.0.lock().unwrap().set_pin(address, pin)
        }
        fn clear_pin(&mut self, address: u8, pin: u8) -> Result<(), C3Error> {
            self.0.lock().unwrap().clear_pin(address, pin)
        }
        fn read_inputs(&mut self, address: u8) -> Result<u8, C3Error> {
            self.0.lock().unwrap().read_inputs(address)
        }
        fn is_present(&mut self, address: u8) -> Result<bool, C3Error> {
            self.0.lock().unwrap().is_present(address)
        }
    }

    fn test_manager() -> (NodeManager, Arc<Mutex<MockExpander>>) {
        let expander = Arc::new(Mutex::new(MockExpander::default()));
        expander.lock().unwrap().present.insert(0x18, true);
        let opd = Opd::new(
            Box::new(SharedExpander(expander.clone())),
            Box::new(MockGpio::default()),
            Box::new(MockGpio { high: true }),
            Box::new(MockAdc::default()),
        );
        let mut mgr = NodeManager::new(opd, vec!["battery_1"], false);
        mgr.add_node(NodeRecord::new("battery_1", 0, 0x18, ProcessorClass::Microcontroller).always_on());
        mgr.enable_bus().unwrap();
        (mgr, expander)
    }

    #[test]
    fn not_found_until_probed() {
        let (mgr, _) = test_manager();
        assert_eq!(mgr.node("battery_1").unwrap().status, NodeStatus::NotFound);
    }

    #[test]
    fn probe_then_enable_then_on_after_heartbeat() {
        let (mut mgr, _) = test_manager();
        mgr.probe_by_name("battery_1").unwrap();
        assert_eq!(mgr.node("battery_1").unwrap().status, NodeStatus::Off);

        mgr.enable_by_name("battery_1").unwrap();
        assert_eq!(mgr.node("battery_1").unwrap().status, NodeStatus::Boot);

        mgr.nodes.get_mut("battery_1").unwrap().record_heartbeat(5, 0);
        mgr.tick(5, 50, |_| {}).unwrap();
        assert_eq!(mgr.node("battery_1").unwrap().status, NodeStatus::On);
    }

    #[test]
    fn bus_disabled_forces_not_found() {
        let (mut mgr, _) = test_manager();
        mgr.probe_by_name("battery_1").unwrap();
        mgr.disable_bus().unwrap();
        mgr.tick(0, 10, |_| {}).unwrap();
        assert_eq!(mgr.node("battery_1").unwrap().status, NodeStatus::NotFound);
    }

    #[test]
    fn reflects_counts_into_od() {
        let (mut mgr, _) = test_manager();
        mgr.probe_by_name("battery_1").unwrap();
        let mut od = ObjectDictionary::new();
        register_entries(&mut od);
        mgr.reflect_counts(&mut od).unwrap();
        assert_eq!(od.read_u8(IDX_NODE_MANAGER_TOTAL_NODES).unwrap(), 1);
        assert_eq!(od.read_u8(IDX_NODE_MANAGER_NODES_OFF).unwrap(), 1);
    }
}
