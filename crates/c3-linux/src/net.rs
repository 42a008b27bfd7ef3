//! UDP loopback radio endpoints (§6): beacon-out, EDL-in, EDL-out each get
//! one owned socket, the shape a "sockets are not shared across tasks"
//! resource policy from §5 requires.

use c3_core::hal::NetworkInterface;
use c3_core::C3Error;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// A UDP datagram endpoint bound to one local port and (for clients)
/// connected to one fixed peer, adapted from the teacher's
/// `Mutex`-guarded-socket, `Ok(0)`-on-timeout convention for raw Ethernet
/// channels onto loopback UDP sockets (the HAL surface this daemon actually
/// needs, §6).
pub struct UdpInterface {
    socket: UdpSocket,
}

impl UdpInterface {
    /// A server endpoint: binds `local_addr` and receives from whoever last
    /// sent (EDL-in, §6).
    pub fn bind(local_addr: SocketAddr, read_timeout: Duration) -> Result<Self, C3Error> {
        let socket = UdpSocket::bind(local_addr).map_err(|_| C3Error::Io("UDP bind failed"))?;
        socket
            .set_read_timeout(Some(read_timeout))
            .map_err(|_| C3Error::Io("UDP set_read_timeout failed"))?;
        Ok(Self { socket })
    }

    /// A client endpoint: binds an ephemeral local port and connects to
    /// `peer_addr` so every `send` targets it (beacon-out, EDL-out, §6).
    pub fn connect(local_addr: SocketAddr, peer_addr: SocketAddr) -> Result<Self, C3Error> {
        let socket = UdpSocket::bind(local_addr).map_err(|_| C3Error::Io("UDP bind failed"))?;
        socket
            .connect(peer_addr)
            .map_err(|_| C3Error::Io("UDP connect failed"))?;
        Ok(Self { socket })
    }
}

impl NetworkInterface for UdpInterface {
    fn send(&mut self, data: &[u8]) -> Result<(), C3Error> {
        self.socket
            .send(data)
            .map_err(|_| C3Error::Io("UDP send failed"))?;
        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, C3Error> {
        match self.socket.recv(buffer) {
            Ok(len) => Ok(len),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(_) => Err(C3Error::Io("UDP recv failed")),
        }
    }
}
