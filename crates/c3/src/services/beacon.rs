//! Beacon transmit service: assembles `c3_core::beacon::BeaconBody` on its
//! configured cadence and pushes it out the beacon UDP socket, only while
//! the mission is actually in `Beacon` state and transmit is enabled.
//!
//! `BEACON_SEND_NOW` bypasses the cadence check entirely — its write
//! callback (wired in `main.rs` via `ObjectDictionary::add_write_callback`)
//! just flips the shared flag this service polls each tick.

use c3_core::beacon::BeaconBody;
use c3_core::hal::NetworkInterface;
use c3_core::od::constants::{IDX_BEACON_DELAY, IDX_BEACON_LAST_TIMESTAMP, IDX_STATUS, IDX_TX_CONTROL_ENABLE};
use c3_core::od::ObjectDictionary;
use c3_core::od::ObjectValue;
use c3_core::state::MissionState;
use c3_core::{C3Error, Service};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(500);

pub struct BeaconService {
    od: Arc<Mutex<ObjectDictionary>>,
    body: BeaconBody,
    radio: Box<dyn NetworkInterface + Send>,
    send_requested: Arc<AtomicBool>,
}

impl BeaconService {
    pub fn new(
        od: Arc<Mutex<ObjectDictionary>>,
        body: BeaconBody,
        radio: Box<dyn NetworkInterface + Send>,
        send_requested: Arc<AtomicBool>,
    ) -> Self {
        Self { od, body, radio, send_requested }
    }
}

impl Service for BeaconService {
    fn name(&self) -> &'static str {
        "beacon"
    }

    fn poll_interval(&self) -> Duration {
        TICK_INTERVAL
    }

    fn on_loop(&mut self) -> Result<(), C3Error> {
        let now = crate::clock::now_unix_s();
        let bypass = self.send_requested.swap(false, Ordering::Relaxed);

        let due = {
            let od = self.od.lock().unwrap();
            let status = MissionState::from_u8(od.read_u8(IDX_STATUS)?).unwrap_or(MissionState::PreDeploy);
            let tx_enabled = od.read_cloned(IDX_TX_CONTROL_ENABLE)? == ObjectValue::Bool(true);

            if bypass {
                tx_enabled
            } else if status != MissionState::Beacon || !tx_enabled {
                false
            } else {
                let delay_s = match od.read_cloned(IDX_BEACON_DELAY)? {
                    ObjectValue::I32(v) => v.max(0) as u32,
                    _ => 10,
                };
                let last = od.read_u32(IDX_BEACON_LAST_TIMESTAMP)?;
                now.saturating_sub(last) >= delay_s
            }
        };

        if !due {
            return Ok(());
        }

        {
            let od = self.od.lock().unwrap();
            let frame = self.body.assemble(&od)?;
            self.radio.send(&frame)?;
        }

        let mut od = self.od.lock().unwrap();
        od.write_internal(IDX_BEACON_LAST_TIMESTAMP, ObjectValue::U32(now))?;

        Ok(())
    }
}
