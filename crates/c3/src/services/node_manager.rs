//! Power-domain node manager service: drives `c3_core::node_manager::NodeManager`
//! at 1 Hz and reflects its node and battery telemetry into the dictionary.
//!
//! The battery-pack voltage ADCs live here rather than on `NodeManager` itself,
//! since they feed `VBATT_BP1`/`VBATT_BP2` (read by the mission state machine)
//! rather than anything the node manager's own FSM consults.

use c3_core::hal::Adc;
use c3_core::od::constants::{IDX_VBATT_BP1, IDX_VBATT_BP2};
use c3_core::od::ObjectDictionary;
use c3_core::node_manager::NodeManager;
use c3_core::od::ObjectValue;
use c3_core::{C3Error, Service};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

const ADC_MAX_COUNTS: f32 = 4095.0;
const ADC_REF_MV: f32 = 3300.0;
const VBATT_DIVIDER_RATIO: f32 = 3.0;

pub struct NodeManagerService {
    od: Arc<Mutex<ObjectDictionary>>,
    mgr: Arc<Mutex<NodeManager>>,
    vbatt1_adc: Box<dyn Adc + Send>,
    vbatt2_adc: Box<dyn Adc + Send>,
    tick: u64,
}

impl NodeManagerService {
    pub fn new(
        od: Arc<Mutex<ObjectDictionary>>,
        mgr: Arc<Mutex<NodeManager>>,
        vbatt1_adc: Box<dyn Adc + Send>,
        vbatt2_adc: Box<dyn Adc + Send>,
    ) -> Self {
        Self { od, mgr, vbatt1_adc, vbatt2_adc, tick: 0 }
    }

    fn read_vbatt_mv(adc: &mut dyn Adc) -> Result<u16, C3Error> {
        let raw = adc.read_raw()?;
        let mv = (raw as f32) / ADC_MAX_COUNTS * ADC_REF_MV * VBATT_DIVIDER_RATIO;
        Ok(mv as u16)
    }
}

impl Service for NodeManagerService {
    fn name(&self) -> &'static str {
        "node_manager"
    }

    fn poll_interval(&self) -> Duration {
        TICK_INTERVAL
    }

    fn on_loop(&mut self) -> Result<(), C3Error> {
        let now = crate::clock::now_unix_s();
        self.tick += 1;

        {
            let mut mgr = self.mgr.lock().unwrap();
            mgr.tick(now, self.tick, |d| thread::sleep(d))?;
        }

        let vbatt1 = Self::read_vbatt_mv(self.vbatt1_adc.as_mut())?;
        let vbatt2 = Self::read_vbatt_mv(self.vbatt2_adc.as_mut())?;

        let mut od = self.od.lock().unwrap();
        {
            let mgr = self.mgr.lock().unwrap();
            mgr.reflect_counts(&mut od)?;
        }
        od.write_internal(IDX_VBATT_BP1, ObjectValue::U16(vbatt1))?;
        od.write_internal(IDX_VBATT_BP2, ObjectValue::U16(vbatt2))?;

        Ok(())
    }
}
