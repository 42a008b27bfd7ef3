//! AX.25 UI-frame framing for the beacon downlink (§4.4, §6).
//!
//! 6-byte space-padded callsigns + SSID + control + PID form a 16-byte
//! header, left-shifted by one bit on the wire; the body follows, then a
//! trailing CRC-32 computed over the body only.

use crate::error::C3Error;

const CALLSIGN_LEN: usize = 6;
const HEADER_LEN: usize = 16;
const CRC_LEN: usize = 4;
pub const MAX_BODY_LEN: usize = 255;

const CONTROL_UI_FRAME: u8 = 0x03;
const PID_NO_LAYER3: u8 = 0xF0;

fn pack_callsign(callsign: &str, ssid: u8) -> [u8; CALLSIGN_LEN + 1] {
    let mut out = [b' '; CALLSIGN_LEN + 1];
    for (i, b) in callsign.as_bytes().iter().take(CALLSIGN_LEN).enumerate() {
        out[i] = b.to_ascii_uppercase();
    }
    out[CALLSIGN_LEN] = ssid;
    out
}

/// Builds one complete AX.25 UI-frame datagram: header (left-shifted one
/// bit) ‖ body ‖ CRC-32 LE over the body.
///
/// Fails if `body` exceeds the 255-byte AX.25 payload budget (§6, §8
/// boundary: "Beacon payload of exactly 255 bytes is accepted; 256 →
/// framing error").
pub fn pack(dest_callsign: &str, dest_ssid: u8, src_callsign: &str, src_ssid: u8, body: &[u8]) -> Result<Vec<u8>, C3Error> {
    if body.len() > MAX_BODY_LEN {
        return Err(C3Error::BadFraming);
    }

    let mut header = [0u8; HEADER_LEN];
    header[0..CALLSIGN_LEN + 1].copy_from_slice(&pack_callsign(dest_callsign, dest_ssid));
    header[CALLSIGN_LEN + 1..2 * (CALLSIGN_LEN + 1)].copy_from_slice(&pack_callsign(src_callsign, src_ssid));
    header[14] = CONTROL_UI_FRAME;
    header[15] = PID_NO_LAYER3;

    let shifted = shift_left_one_bit(&header);

    let crc = crc32fast_body(body);

    let mut packet = Vec::with_capacity(HEADER_LEN + body.len() + CRC_LEN);
    packet.extend_from_slice(&shifted);
    packet.extend_from_slice(body);
    packet.extend_from_slice(&crc.to_le_bytes());
    Ok(packet)
}

/// Left-shifts a byte buffer by one bit, the AX.25 wire convention for its
/// address/control field (§6).
fn shift_left_one_bit(bytes: &[u8; HEADER_LEN]) -> [u8; HEADER_LEN] {
    let mut out = [0u8; HEADER_LEN];
    let mut carry = 0u8;
    for i in (0..HEADER_LEN).rev() {
        out[i] = (bytes[i] << 1) | carry;
        carry = (bytes[i] & 0x80) >> 7;
    }
    out
}

fn crc32fast_body(body: &[u8]) -> u32 {
    const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
    CRC32.checksum(body)
}

/// Unpacks an AX.25 UI-frame for tests/diagnostics, recovering the body and
/// verifying the trailing CRC.
pub fn unpack(packet: &[u8]) -> Result<Vec<u8>, C3Error> {
    if packet.len() < HEADER_LEN + CRC_LEN {
        return Err(C3Error::BadFraming);
    }
    let (rest, crc_bytes) = packet.split_at(packet.len() - CRC_LEN);
    let body = &rest[HEADER_LEN..];
    let received = u32::from_le_bytes(crc_bytes.try_into().map_err(|_| C3Error::BadFraming)?);
    if crc32fast_body(body) != received {
        return Err(C3Error::BadCrc);
    }
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_and_unpacks_a_body() {
        let body = vec![1, 2, 3, 4, 5];
        let packet = pack("ORESAT", 0, "ORESAT", 0, &body).unwrap();
        assert_eq!(packet.len(), HEADER_LEN + body.len() + CRC_LEN);
        assert_eq!(unpack(&packet).unwrap(), body);
    }

    #[test]
    fn header_is_left_shifted_one_bit() {
        let packet = pack("ORESAT", 0, "ORESAT", 0, &[]).unwrap();
        // 'O' = 0x4F; left-shifted by one bit = 0x9E.
        assert_eq!(packet[0], 0x4Fu8 << 1);
    }

    #[test]
    fn body_of_255_bytes_is_accepted() {
        let body = vec![0u8; MAX_BODY_LEN];
        assert!(pack("ORESAT", 0, "ORESAT", 0, &body).is_ok());
    }

    #[test]
    fn body_of_256_bytes_is_rejected() {
        let body = vec![0u8; MAX_BODY_LEN + 1];
        assert_eq!(pack("ORESAT", 0, "ORESAT", 0, &body).unwrap_err(), C3Error::BadFraming);
    }
}
