//! Pack/unpack of EDL transfer frames: authenticated integrity under a
//! keyed MAC, framed by the layout in `super::frame` (§4.1).

use super::frame::{
    OriginTag, PrimaryHeader, CRC_LEN, DATA_FIELD_HEADER_LEN, INSERT_ZONE_LEN, MAC_LEN,
    MIN_FRAME_LEN, PRIMARY_HEADER_LEN, SPACECRAFT_ID,
};
use crate::error::C3Error;
use crc::{Crc, CRC_16_XMODEM};
use hmac::{Hmac, Mac};
use sha3::Sha3_256;
use subtle::ConstantTimeEq;

type HmacSha3_256 = Hmac<Sha3_256>;

const FRAME_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// A 32-byte keyed MAC secret, one of the four crypto-key slots.
pub type EdlKey = [u8; 32];

fn compute_mac(key: &EdlKey, payload: &[u8]) -> [u8; MAC_LEN] {
    let mut mac = HmacSha3_256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.finalize().into_bytes().into()
}

/// Serializes `payload` into a complete transfer frame, MAC'd with `key`.
///
/// `seq_num` is written into the insert zone; `origin` selects the primary
/// header's source/destination bit; `virtual_channel_id` distinguishes
/// command traffic from file-transfer traffic (§4.1).
pub fn pack(
    payload: &[u8],
    seq_num: u32,
    origin: OriginTag,
    virtual_channel_id: u8,
    key: &EdlKey,
) -> Vec<u8> {
    let mac = compute_mac(key, payload);

    let data_field_len = payload.len() + MAC_LEN;
    let frame_len = PRIMARY_HEADER_LEN + INSERT_ZONE_LEN + DATA_FIELD_HEADER_LEN + data_field_len + CRC_LEN;

    let header = PrimaryHeader {
        spacecraft_id: SPACECRAFT_ID,
        virtual_channel_id,
        frame_len_field: (frame_len - 1) as u16,
        origin,
    };

    let mut frame = Vec::with_capacity(frame_len);
    frame.extend_from_slice(&header.to_bytes());
    frame.extend_from_slice(&seq_num.to_le_bytes());
    // Fixed data-field header byte; the data field's actual length is
    // recovered from the overall frame length, not this byte — a 1-byte
    // length here would cap data fields at 255 bytes, well under the
    // ~950-byte frames this link needs to carry.
    frame.push(0);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&mac);

    let crc = FRAME_CRC.checksum(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());

    frame
}

/// The result of successfully unpacking a transfer frame.
pub struct Unpacked {
    pub payload: Vec<u8>,
    pub seq_num: u32,
    pub origin: OriginTag,
    pub virtual_channel_id: u8,
}

/// Validates and strips a transfer frame's outer and inner envelopes.
///
/// `allow_unauth` skips MAC verification — development use only (§4.1).
pub fn unpack(bytes: &[u8], key: &EdlKey, allow_unauth: bool) -> Result<Unpacked, C3Error> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(C3Error::BadFraming);
    }

    let (body, crc_bytes) = bytes.split_at(bytes.len() - CRC_LEN);
    let received_crc = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    if FRAME_CRC.checksum(body) != received_crc {
        return Err(C3Error::BadCrc);
    }

    let mut header_bytes = [0u8; PRIMARY_HEADER_LEN];
    header_bytes.copy_from_slice(&body[0..PRIMARY_HEADER_LEN]);
    let header = PrimaryHeader::from_bytes(&header_bytes);

    let seq_start = PRIMARY_HEADER_LEN;
    let seq_num = u32::from_le_bytes(
        body[seq_start..seq_start + INSERT_ZONE_LEN]
            .try_into()
            .map_err(|_| C3Error::BadFraming)?,
    );

    let data_field_header_start = seq_start + INSERT_ZONE_LEN;
    let data_field_start = data_field_header_start + DATA_FIELD_HEADER_LEN;

    if body.len() < data_field_start {
        return Err(C3Error::BadFraming);
    }
    let data_field_len = body.len() - data_field_start;
    if data_field_len < MAC_LEN {
        return Err(C3Error::BadFraming);
    }

    let data_field = &body[data_field_start..data_field_start + data_field_len];
    let (payload, received_mac) = data_field.split_at(data_field_len - MAC_LEN);

    if !allow_unauth {
        let expected_mac = compute_mac(key, payload);
        if expected_mac.ct_eq(received_mac).unwrap_u8() != 1 {
            return Err(C3Error::BadAuth);
        }
    }

    Ok(Unpacked {
        payload: payload.to_vec(),
        seq_num,
        origin: header.origin,
        virtual_channel_id: header.virtual_channel_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: EdlKey = [0x42; 32];

    #[test]
    fn round_trips_a_frame() {
        let payload = vec![0x01, 0xAA, 0xBB, 0xCC];
        let frame = pack(&payload, 7, OriginTag::Uplink, 0, &KEY);
        let unpacked = unpack(&frame, &KEY, false).unwrap();
        assert_eq!(unpacked.payload, payload);
        assert_eq!(unpacked.seq_num, 7);
        assert_eq!(unpacked.origin, OriginTag::Uplink);
        assert_eq!(unpacked.virtual_channel_id, 0);
    }

    #[test]
    fn rejects_frame_shorter_than_minimum() {
        let err = unpack(&[0u8; 10], &KEY, false).unwrap_err();
        assert_eq!(err, C3Error::BadFraming);
    }

    #[test]
    fn rejects_tampered_crc() {
        let mut frame = pack(&[0x01], 1, OriginTag::Uplink, 0, &KEY);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        assert_eq!(unpack(&frame, &KEY, false).unwrap_err(), C3Error::BadCrc);
    }

    #[test]
    fn rejects_wrong_key() {
        let frame = pack(&[0x01, 0x02], 1, OriginTag::Uplink, 0, &KEY);
        let other_key = [0x43; 32];
        assert_eq!(
            unpack(&frame, &other_key, false).unwrap_err(),
            C3Error::BadAuth
        );
    }

    #[test]
    fn allow_unauth_skips_mac_check() {
        let frame = pack(&[0x01, 0x02], 1, OriginTag::Uplink, 0, &KEY);
        let other_key = [0x43; 32];
        assert!(unpack(&frame, &other_key, true).is_ok());
    }

    #[test]
    fn round_trips_a_payload_near_the_max_datagram_size() {
        // Practical max frame ~950 bytes (§6); this payload alone exceeds
        // the 255-byte ceiling a 1-byte length field would impose.
        let payload = vec![0xAB; 900];
        let frame = pack(&payload, 42, OriginTag::Downlink, 0, &KEY);
        let unpacked = unpack(&frame, &KEY, false).unwrap();
        assert_eq!(unpacked.payload, payload);
        assert_eq!(unpacked.seq_num, 42);
    }
}
