//! EDL uplink/downlink service: reads command frames off the EDL-in socket,
//! verifies and dispatches them, and sends a downlink response frame back
//! out the EDL-out socket.
//!
//! `poll_interval` returns zero — the EDL-in socket's own read timeout
//! (`radios::edl_in`) already provides the idle cadence, so there is no
//! reason for `ServiceRunner` to add a second wait on top of it.

use crate::fleet;
use c3_core::edl::command::{self, CommandRegistry, Request, Response, Value};
use c3_core::edl::frame::{OriginTag, VC_COMMAND, VC_FILE_TRANSFER};
use c3_core::edl::{self, registry};
use c3_core::hal::{NetworkInterface, Rtc};
use c3_core::node_manager::NodeManager;
use c3_core::od::constants::{
    IDX_EDL_LAST_TIMESTAMP, IDX_EDL_SEQUENCE_NUMBER, IDX_SYSTEM_RESET, IDX_TX_CONTROL_ENABLE,
    IDX_TX_LAST_ENABLE_TIMESTAMP,
};
use c3_core::od::{ObjectDictionary, ObjectValue};
use c3_core::state::ResetKind;
use c3_core::{C3Error, Service};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct EdlService {
    od: Arc<Mutex<ObjectDictionary>>,
    mgr: Arc<Mutex<NodeManager>>,
    rtc: Arc<Mutex<Box<dyn Rtc + Send>>>,
    rx: Box<dyn NetworkInterface + Send>,
    tx: Box<dyn NetworkInterface + Send>,
    flight_mode: bool,
    allow_unauth: bool,
    beacon_send_requested: Arc<AtomicBool>,
    rx_buf: Vec<u8>,
}

impl EdlService {
    pub fn new(
        od: Arc<Mutex<ObjectDictionary>>,
        mgr: Arc<Mutex<NodeManager>>,
        rtc: Arc<Mutex<Box<dyn Rtc + Send>>>,
        rx: Box<dyn NetworkInterface + Send>,
        tx: Box<dyn NetworkInterface + Send>,
        flight_mode: bool,
        allow_unauth: bool,
        beacon_send_requested: Arc<AtomicBool>,
    ) -> Self {
        Self {
            od,
            mgr,
            rtc,
            rx,
            tx,
            flight_mode,
            allow_unauth,
            beacon_send_requested,
            rx_buf: vec![0u8; 1024],
        }
    }

    fn handle_command(&mut self, req: Request) -> Result<Option<Response>, C3Error> {
        let values = match req.id {
            command::TX_CONTROL => self.handle_tx_control(&req.values)?,
            command::C3_SOFT_RESET => self.handle_reset(ResetKind::SoftReset)?,
            command::C3_HARD_RESET => self.handle_reset(ResetKind::HardReset)?,
            command::C3_FACTORY_RESET => self.handle_reset(ResetKind::FactoryReset)?,
            command::NODE_ENABLE => self.handle_node_enable(&req.values)?,
            command::NODE_STATUS => self.handle_node_status(&req.values)?,
            command::SDO_WRITE => self.handle_sdo_write(&req.values)?,
            command::SDO_READ => self.handle_sdo_read(&req.values)?,
            command::SYNC => vec![Value::Bool(true)],
            command::OPD_SYSENABLE => self.handle_opd_sysenable(&req.values)?,
            command::OPD_SCAN => self.handle_opd_scan()?,
            command::OPD_PROBE => self.handle_opd_probe(&req.values)?,
            command::OPD_ENABLE => self.handle_opd_enable(&req.values)?,
            command::OPD_RESET => self.handle_opd_reset(&req.values)?,
            command::OPD_STATUS => self.handle_opd_status(&req.values)?,
            command::RTC_SET_TIME => self.handle_rtc_set_time(&req.values)?,
            command::TIME_SYNC => vec![Value::Bool(true)],
            command::BEACON_PING => {
                self.beacon_send_requested.store(true, Ordering::Relaxed);
                vec![]
            }
            command::PING => req.values.clone(),
            command::RX_TEST => vec![],
            _ => return Err(C3Error::UnknownCommand(req.id.0)),
        };

        let descriptor = CommandRegistry::find(req.id).ok_or(C3Error::UnknownCommand(req.id.0))?;
        if descriptor.response_schema.is_empty() {
            return Ok(None);
        }
        Ok(Some(Response { id: req.id, values }))
    }

    fn handle_tx_control(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let enable = args[0].as_bool().ok_or(C3Error::BadRequest(command::TX_CONTROL.0))?;
        let mut od = self.od.lock().unwrap();
        od.write(IDX_TX_CONTROL_ENABLE, ObjectValue::Bool(enable))?;
        if enable {
            let now = crate::clock::now_unix_s();
            od.write_internal(IDX_TX_LAST_ENABLE_TIMESTAMP, ObjectValue::U32(now))?;
        }
        Ok(vec![Value::Bool(enable)])
    }

    fn handle_reset(&mut self, kind: ResetKind) -> Result<Vec<Value>, C3Error> {
        let mut od = self.od.lock().unwrap();
        od.write_internal(IDX_SYSTEM_RESET, ObjectValue::U8(kind.to_u8()))?;
        Ok(vec![])
    }

    fn handle_node_enable(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let node_id = args[0].as_u8().ok_or(C3Error::BadRequest(command::NODE_ENABLE.0))?;
        let enable = args[1].as_bool().ok_or(C3Error::BadRequest(command::NODE_ENABLE.0))?;
        let mut mgr = self.mgr.lock().unwrap();
        let name = mgr.name_by_can_id(node_id)?;
        if enable {
            mgr.enable_by_name(name)?;
        } else {
            mgr.disable_by_name(name)?;
        }
        Ok(vec![Value::U8(mgr.node(name)?.status.to_u8())])
    }

    fn handle_node_status(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let node_id = args[0].as_u8().ok_or(C3Error::BadRequest(command::NODE_STATUS.0))?;
        let mgr = self.mgr.lock().unwrap();
        let name = mgr.name_by_can_id(node_id)?;
        Ok(vec![Value::U8(mgr.node(name)?.status.to_u8())])
    }

    fn handle_sdo_write(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let node_id = args[0].as_u8().ok_or(C3Error::BadRequest(command::SDO_WRITE.0))?;
        if node_id != 0 {
            return Ok(vec![Value::U32(command::ABORT_CODE_NO_SUCH_OBJECT)]);
        }
        let index = args[1].as_u16().ok_or(C3Error::BadRequest(command::SDO_WRITE.0))?;
        let buffer = args[4].as_bytes().ok_or(C3Error::BadRequest(command::SDO_WRITE.0))?;

        let mut od = self.od.lock().unwrap();
        let result = od
            .read_cloned(index)
            .and_then(|template| ObjectValue::deserialize(buffer, &template, index))
            .and_then(|value| od.write(index, value));

        match result {
            Ok(()) => Ok(vec![Value::U32(0)]),
            Err(_) => Ok(vec![Value::U32(command::ABORT_CODE_NO_SUCH_OBJECT)]),
        }
    }

    fn handle_sdo_read(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let node_id = args[0].as_u8().ok_or(C3Error::BadRequest(command::SDO_READ.0))?;
        if node_id != 0 {
            return Ok(vec![Value::U32(command::ABORT_CODE_NO_SUCH_OBJECT), Value::U32(0), Value::Bytes(vec![])]);
        }
        let index = args[1].as_u16().ok_or(C3Error::BadRequest(command::SDO_READ.0))?;

        let od = self.od.lock().unwrap();
        match od.read_cloned(index) {
            Ok(value) => {
                let bytes = value.serialize();
                Ok(vec![Value::U32(0), Value::U32(bytes.len() as u32), Value::Bytes(bytes)])
            }
            Err(_) => Ok(vec![Value::U32(command::ABORT_CODE_NO_SUCH_OBJECT), Value::U32(0), Value::Bytes(vec![])]),
        }
    }

    fn handle_opd_sysenable(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let enable = args[0].as_bool().ok_or(C3Error::BadRequest(command::OPD_SYSENABLE.0))?;
        let mut mgr = self.mgr.lock().unwrap();
        if enable {
            mgr.enable_bus()?;
        } else {
            mgr.disable_bus()?;
        }
        Ok(vec![Value::Bool(mgr.is_subsystem_enabled())])
    }

    fn handle_opd_scan(&mut self) -> Result<Vec<Value>, C3Error> {
        let mut mgr = self.mgr.lock().unwrap();
        Ok(vec![Value::U8(mgr.scan()?)])
    }

    fn handle_opd_probe(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let addr = args[0].as_u8().ok_or(C3Error::BadRequest(command::OPD_PROBE.0))?;
        let mut mgr = self.mgr.lock().unwrap();
        let name = mgr.node_by_addr(addr)?.name;
        Ok(vec![Value::Bool(mgr.probe_by_name(name)?)])
    }

    fn handle_opd_enable(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let addr = args[0].as_u8().ok_or(C3Error::BadRequest(command::OPD_ENABLE.0))?;
        let enable = args[1].as_bool().ok_or(C3Error::BadRequest(command::OPD_ENABLE.0))?;
        let mut mgr = self.mgr.lock().unwrap();
        let name = mgr.node_by_addr(addr)?.name;
        if enable {
            mgr.enable_by_name(name)?;
        } else {
            mgr.disable_by_name(name)?;
        }
        Ok(vec![Value::U8(mgr.node(name)?.status.to_u8())])
    }

    fn handle_opd_reset(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let addr = args[0].as_u8().ok_or(C3Error::BadRequest(command::OPD_RESET.0))?;
        let mut mgr = self.mgr.lock().unwrap();
        let name = mgr.node_by_addr(addr)?.name;
        mgr.reset_by_name(name, 3, |d| std::thread::sleep(d))?;
        Ok(vec![Value::U8(mgr.node(name)?.status.to_u8())])
    }

    fn handle_opd_status(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let addr = args[0].as_u8().ok_or(C3Error::BadRequest(command::OPD_STATUS.0))?;
        let mgr = self.mgr.lock().unwrap();
        Ok(vec![Value::U8(mgr.node_by_addr(addr)?.status.to_u8())])
    }

    fn handle_rtc_set_time(&mut self, args: &[Value]) -> Result<Vec<Value>, C3Error> {
        let seconds = args[0].as_u32().ok_or(C3Error::BadRequest(command::RTC_SET_TIME.0))?;
        self.rtc.lock().unwrap().set_unix_time(seconds)?;
        Ok(vec![Value::Bool(true)])
    }
}

impl Service for EdlService {
    fn name(&self) -> &'static str {
        "edl"
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(0)
    }

    fn on_loop(&mut self) -> Result<(), C3Error> {
        let n = self.rx.receive(&mut self.rx_buf)?;
        if n == 0 {
            return Ok(());
        }
        let frame = self.rx_buf[..n].to_vec();
        let now = crate::clock::now_unix_s();

        let key = {
            let od = self.od.lock().unwrap();
            registry::active_key(&od)?
        };

        let unpacked = match edl::codec::unpack(&frame, &key, self.allow_unauth) {
            Ok(u) => u,
            Err(e) => {
                let mut od = self.od.lock().unwrap();
                registry::record_rejected(&mut od)?;
                log::warn!("[edl] rejected frame: {e}");
                return Ok(());
            }
        };

        {
            let mut od = self.od.lock().unwrap();
            if self.flight_mode {
                let persisted = od.read_u32(IDX_EDL_SEQUENCE_NUMBER)?;
                if unpacked.seq_num <= persisted {
                    registry::record_rejected(&mut od)?;
                    log::warn!("[edl] rejected replayed sequence number {}", unpacked.seq_num);
                    return Ok(());
                }
            }
            od.write_internal(IDX_EDL_LAST_TIMESTAMP, ObjectValue::U32(now))?;
            if self.flight_mode {
                registry::advance_sequence(&mut od)?;
            }
        }

        if unpacked.virtual_channel_id == VC_FILE_TRANSFER {
            log::info!("[edl] file transfer channel not implemented, ignoring frame");
            return Ok(());
        }
        if unpacked.virtual_channel_id != VC_COMMAND {
            log::warn!("[edl] unknown virtual channel {}", unpacked.virtual_channel_id);
            return Ok(());
        }

        let req = match CommandRegistry::decode_request(&unpacked.payload) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("[edl] bad command payload: {e}");
                return Ok(());
            }
        };

        let response = match self.handle_command(req) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("[edl] command handling failed: {e}");
                return Ok(());
            }
        };

        if let Some(response) = response {
            let payload = CommandRegistry::encode_response(&response)?;
            let (seq, key) = {
                let od = self.od.lock().unwrap();
                (od.read_u32(IDX_EDL_SEQUENCE_NUMBER)?, registry::active_key(&od)?)
            };
            let out = edl::codec::pack(&payload, seq, OriginTag::Downlink, VC_COMMAND, &key);
            self.tx.send(&out)?;
        }

        Ok(())
    }
}
