//! EDL transfer frame layout (§3, §4.1): the fixed outer envelope every
//! uplink/downlink datagram carries.

/// Fixed spacecraft identifier stamped into every primary header.
pub const SPACECRAFT_ID: u16 = 0x4F53;

/// Virtual channel carrying EDL command traffic.
pub const VC_COMMAND: u8 = 0;
/// Virtual channel carrying file-transfer traffic.
pub const VC_FILE_TRANSFER: u8 = 1;

pub const PRIMARY_HEADER_LEN: usize = 7;
pub const INSERT_ZONE_LEN: usize = 4;
pub const DATA_FIELD_HEADER_LEN: usize = 1;
pub const MAC_LEN: usize = 32;
pub const CRC_LEN: usize = 2;

/// Minimum complete frame length: header + insert zone + data-field header +
/// (empty data field, i.e. just the MAC) + CRC.
pub const MIN_FRAME_LEN: usize =
    PRIMARY_HEADER_LEN + INSERT_ZONE_LEN + DATA_FIELD_HEADER_LEN + MAC_LEN + CRC_LEN;

/// Which side originated a frame — the caller-supplied source/destination
/// bit in the primary header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginTag {
    /// Ground station → spacecraft.
    Uplink,
    /// Spacecraft → ground station.
    Downlink,
}

/// The fixed 7-byte primary header preceding the insert zone.
///
/// Layout (little-endian throughout): spacecraft-id (u16), a packed byte
/// combining map-id (always 0 here) and virtual-channel-id, frame length
/// minus one (u16), and a packed byte carrying the origin bit plus
/// reserved/sequence-control bits the original format defines but this
/// deployment never varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryHeader {
    pub spacecraft_id: u16,
    pub virtual_channel_id: u8,
    pub frame_len_field: u16,
    pub origin: OriginTag,
}

impl PrimaryHeader {
    pub fn to_bytes(self) -> [u8; PRIMARY_HEADER_LEN] {
        let mut buf = [0u8; PRIMARY_HEADER_LEN];
        buf[0..2].copy_from_slice(&self.spacecraft_id.to_le_bytes());
        buf[2] = self.virtual_channel_id;
        buf[3..5].copy_from_slice(&self.frame_len_field.to_le_bytes());
        buf[5] = match self.origin {
            OriginTag::Uplink => 0,
            OriginTag::Downlink => 1,
        };
        buf[6] = 0;
        buf
    }

    pub fn from_bytes(buf: &[u8; PRIMARY_HEADER_LEN]) -> Self {
        Self {
            spacecraft_id: u16::from_le_bytes([buf[0], buf[1]]),
            virtual_channel_id: buf[2],
            frame_len_field: u16::from_le_bytes([buf[3], buf[4]]),
            origin: if buf[5] == 0 {
                OriginTag::Uplink
            } else {
                OriginTag::Downlink
            },
        }
    }
}
