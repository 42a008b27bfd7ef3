//! The three loopback UDP radio endpoints (§6): composed here from
//! `c3_linux::UdpInterface` rather than owned by a single reference file —
//! each endpoint is just one `bind`/`connect` call with its fixed port.

use c3_core::C3Error;
use c3_linux::UdpInterface;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const BEACON_PORT: u16 = 10015;
const EDL_IN_PORT: u16 = 10025;
const EDL_OUT_PORT: u16 = 10016;
const WATCHDOG_PORT: u16 = 20001;
const EDL_IN_READ_TIMEOUT: Duration = Duration::from_millis(100);

pub fn beacon_out() -> Result<UdpInterface, C3Error> {
    UdpInterface::connect(SocketAddr::new(LOOPBACK, 0), SocketAddr::new(LOOPBACK, BEACON_PORT))
}

pub fn edl_in() -> Result<UdpInterface, C3Error> {
    UdpInterface::bind(SocketAddr::new(LOOPBACK, EDL_IN_PORT), EDL_IN_READ_TIMEOUT)
}

pub fn edl_out() -> Result<UdpInterface, C3Error> {
    UdpInterface::connect(SocketAddr::new(LOOPBACK, 0), SocketAddr::new(LOOPBACK, EDL_OUT_PORT))
}

pub fn watchdog_peer() -> SocketAddr {
    SocketAddr::new(LOOPBACK, WATCHDOG_PORT)
}

pub fn watchdog_local() -> SocketAddr {
    SocketAddr::new(LOOPBACK, 0)
}
