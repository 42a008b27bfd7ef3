//! The concrete state service (§4.3): drives `c3_core::state::StateMachine`
//! at 10 Hz and carries out the `Action`s it returns — firing the antenna
//! deployment GPIOs, and requesting a shutdown on `Reset`.

use crate::shutdown::ShutdownHandle;
use c3_core::hal::{Gpio, ObjectDictionaryStorage};
use c3_core::od::{constants::IDX_STATUS, ObjectDictionary};
use c3_core::state::{Action, MissionState, StateMachine};
use c3_core::{persistent, C3Error, Service};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub struct StateService {
    od: Arc<Mutex<ObjectDictionary>>,
    storage: Arc<Mutex<Box<dyn ObjectDictionaryStorage + Send>>>,
    fsm: StateMachine,
    monopole: Box<dyn Gpio + Send>,
    helical: Box<dyn Gpio + Send>,
    shutdown: ShutdownHandle,
    flight_mode: bool,
    euid_is_root: bool,
}

impl StateService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        od: Arc<Mutex<ObjectDictionary>>,
        storage: Arc<Mutex<Box<dyn ObjectDictionaryStorage + Send>>>,
        boot_monotonic_s: u32,
        monopole: Box<dyn Gpio + Send>,
        helical: Box<dyn Gpio + Send>,
        shutdown: ShutdownHandle,
        flight_mode: bool,
        euid_is_root: bool,
    ) -> Self {
        Self {
            od,
            storage,
            fsm: StateMachine::new(boot_monotonic_s),
            monopole,
            helical,
            shutdown,
            flight_mode,
            euid_is_root,
        }
    }

    fn fire_antennas(&mut self, pulse_width_ms: u32, inter_deploy_delay_ms: u32) -> Result<(), C3Error> {
        let pulse = Duration::from_millis(pulse_width_ms as u64);
        let gap = Duration::from_millis(inter_deploy_delay_ms as u64);

        self.monopole.set_high()?;
        std::thread::sleep(pulse);
        self.monopole.set_low()?;
        std::thread::sleep(gap);

        self.helical.set_high()?;
        std::thread::sleep(pulse);
        self.helical.set_low()?;

        Ok(())
    }
}

impl Service for StateService {
    fn name(&self) -> &'static str {
        "state"
    }

    fn poll_interval(&self) -> Duration {
        TICK_INTERVAL
    }

    fn on_loop(&mut self) -> Result<(), C3Error> {
        let now = crate::clock::now_unix_s();
        let (actions, persist) = {
            let mut od = self.od.lock().unwrap();
            let actions = self.fsm.tick(&mut od, now, self.flight_mode, self.euid_is_root)?;
            let status = MissionState::from_u8(od.read_u8(IDX_STATUS)?).unwrap_or(MissionState::PreDeploy);
            let persist = self.fsm.should_persist(status);
            (actions, persist)
        };

        for action in actions {
            match action {
                Action::FireAntennas { pulse_width_ms, inter_deploy_delay_ms } => {
                    self.fire_antennas(pulse_width_ms, inter_deploy_delay_ms)?;
                }
                Action::Reset(kind) => {
                    self.shutdown.request(kind);
                }
            }
        }

        if persist {
            let od = self.od.lock().unwrap();
            persistent::store_state(&od, self.storage.lock().unwrap().as_mut())?;
        }

        Ok(())
    }
}
