//! Watchdog-petter (§6, §10.5): a UDP client that pets the hardware
//! watchdog once a second, throttled to every tenth second outside of
//! flight mode (or while any service is known to have failed), so a bench
//! run sitting in a debugger doesn't trip a reset.

use crate::runner::ServiceRunner;
use c3_core::hal::NetworkInterface;
use c3_core::log::{LogContext, LogMetadata};
use c3_linux::UdpInterface;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PET_PAYLOAD: &[u8; 3] = b"PET";
const PET_INTERVAL: Duration = Duration::from_secs(1);
const FLIGHT_MODE_CADENCE_TICKS: u32 = 10;

pub struct Watchdog {
    socket: UdpInterface,
}

impl Watchdog {
    pub fn connect(local_addr: SocketAddr, peer_addr: SocketAddr) -> Result<Self, c3_core::C3Error> {
        Ok(Self { socket: UdpInterface::connect(local_addr, peer_addr)? })
    }

    pub fn pet(&mut self) -> Result<(), c3_core::C3Error> {
        self.socket.send(PET_PAYLOAD)
    }

    /// Drives the petting loop until `stop` is set. In flight mode, a pet is
    /// only actually sent every tenth tick — unless a service has failed, in
    /// which case every tick pets, since a wedged service is exactly the
    /// condition the watchdog exists to catch (§10.5).
    pub fn run(mut self, runners: &[ServiceRunner], flight_mode: bool, stop: &AtomicBool) {
        let ctx = LogContext { service: "watchdog", node: None };
        let mut tick: u32 = 0;
        while !stop.load(Ordering::Relaxed) {
            let any_failed = runners.iter().any(|r| r.has_failed());
            let due = !flight_mode || any_failed || tick % FLIGHT_MODE_CADENCE_TICKS == 0;
            if due {
                if let Err(e) = self.pet() {
                    log::warn!("[{}] pet failed: {e}", ctx.meta());
                }
            }
            tick = tick.wrapping_add(1);
            thread::sleep(PET_INTERVAL);
        }
    }
}
