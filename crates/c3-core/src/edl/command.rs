//! EDL command registry: command id → (request schema, response schema),
//! table-driven (de)serialization of the typed payload that follows the
//! command id byte (§4.2).
//!
//! Mirrors the teacher's `sdo/command/base.rs` bounds-checked manual
//! (de)serialization, generalized from a fixed `CommandId` enum with
//! hand-written match arms to a declarative schema table, the shape
//! `protocols/edl_command.py`'s `EDL_COMMANDS` dict plays in the original.
//! Dispatch to actual handler logic (mutating the OD, node manager, or OPD)
//! is left to the caller — this module only owns decode/encode of the typed
//! payload, since the handlers need mutable access to live service state
//! this crate doesn't own.

use crate::error::C3Error;

/// The authoritative EDL command codes (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CommandId(pub u8);

pub const TX_CONTROL: CommandId = CommandId(0);
pub const C3_SOFT_RESET: CommandId = CommandId(1);
pub const C3_HARD_RESET: CommandId = CommandId(2);
pub const C3_FACTORY_RESET: CommandId = CommandId(3);
pub const NODE_ENABLE: CommandId = CommandId(4);
pub const NODE_STATUS: CommandId = CommandId(5);
pub const SDO_WRITE: CommandId = CommandId(6);
pub const SDO_READ: CommandId = CommandId(7);
pub const SYNC: CommandId = CommandId(8);
pub const OPD_SYSENABLE: CommandId = CommandId(9);
pub const OPD_SCAN: CommandId = CommandId(10);
pub const OPD_PROBE: CommandId = CommandId(11);
pub const OPD_ENABLE: CommandId = CommandId(12);
pub const OPD_RESET: CommandId = CommandId(13);
pub const OPD_STATUS: CommandId = CommandId(14);
pub const RTC_SET_TIME: CommandId = CommandId(15);
pub const TIME_SYNC: CommandId = CommandId(16);
pub const BEACON_PING: CommandId = CommandId(17);
pub const PING: CommandId = CommandId(18);
pub const RX_TEST: CommandId = CommandId(19);

/// The abort code SDO_READ/SDO_WRITE return when their handler cannot
/// complete (§4.2, §9 resolution #4: any node id other than the local node).
pub const ABORT_CODE_NO_SUCH_OBJECT: u32 = 0x0609_0011;

/// One typed scalar field in a request/response schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Bool,
    U8,
    U16,
    U32,
    /// Trailing variable-length byte buffer; only valid as the last field.
    Bytes,
}

/// A decoded or to-be-encoded scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::U8(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::U16(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

/// A command's schema: its identity plus ordered request/response field
/// lists. An empty schema means "no payload" (no arguments / no response).
pub struct CommandDescriptor {
    pub id: CommandId,
    pub name: &'static str,
    pub request_schema: &'static [Field],
    pub response_schema: &'static [Field],
}

/// A decoded command request: the command id plus its typed, ordered
/// argument values.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: CommandId,
    pub values: Vec<Value>,
}

/// A typed response to be encoded back into the wire payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: CommandId,
    pub values: Vec<Value>,
}

/// The full EDL command table (§4.2, authoritative).
pub const COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { id: TX_CONTROL, name: "TX_CONTROL", request_schema: &[Field::Bool], response_schema: &[Field::Bool] },
    CommandDescriptor { id: C3_SOFT_RESET, name: "C3_SOFT_RESET", request_schema: &[], response_schema: &[] },
    CommandDescriptor { id: C3_HARD_RESET, name: "C3_HARD_RESET", request_schema: &[], response_schema: &[] },
    CommandDescriptor { id: C3_FACTORY_RESET, name: "C3_FACTORY_RESET", request_schema: &[], response_schema: &[] },
    CommandDescriptor { id: NODE_ENABLE, name: "NODE_ENABLE", request_schema: &[Field::U8, Field::Bool], response_schema: &[Field::U8] },
    CommandDescriptor { id: NODE_STATUS, name: "NODE_STATUS", request_schema: &[Field::U8], response_schema: &[Field::U8] },
    CommandDescriptor { id: SDO_WRITE, name: "SDO_WRITE", request_schema: &[Field::U8, Field::U16, Field::U8, Field::U32, Field::Bytes], response_schema: &[Field::U32] },
    CommandDescriptor { id: SDO_READ, name: "SDO_READ", request_schema: &[Field::U8, Field::U16, Field::U8], response_schema: &[Field::U32, Field::U32, Field::Bytes] },
    CommandDescriptor { id: SYNC, name: "SYNC", request_schema: &[], response_schema: &[Field::Bool] },
    CommandDescriptor { id: OPD_SYSENABLE, name: "OPD_SYSENABLE", request_schema: &[Field::Bool], response_schema: &[Field::Bool] },
    CommandDescriptor { id: OPD_SCAN, name: "OPD_SCAN", request_schema: &[], response_schema: &[Field::U8] },
    CommandDescriptor { id: OPD_PROBE, name: "OPD_PROBE", request_schema: &[Field::U8], response_schema: &[Field::Bool] },
    CommandDescriptor { id: OPD_ENABLE, name: "OPD_ENABLE", request_schema: &[Field::U8, Field::Bool], response_schema: &[Field::U8] },
    CommandDescriptor { id: OPD_RESET, name: "OPD_RESET", request_schema: &[Field::U8], response_schema: &[Field::U8] },
    CommandDescriptor { id: OPD_STATUS, name: "OPD_STATUS", request_schema: &[Field::U8], response_schema: &[Field::U8] },
    CommandDescriptor { id: RTC_SET_TIME, name: "RTC_SET_TIME", request_schema: &[Field::U32], response_schema: &[Field::Bool] },
    CommandDescriptor { id: TIME_SYNC, name: "TIME_SYNC", request_schema: &[], response_schema: &[Field::Bool] },
    CommandDescriptor { id: BEACON_PING, name: "BEACON_PING", request_schema: &[], response_schema: &[] },
    CommandDescriptor { id: PING, name: "PING", request_schema: &[Field::U32], response_schema: &[Field::U32] },
    CommandDescriptor { id: RX_TEST, name: "RX_TEST", request_schema: &[], response_schema: &[] },
];

/// Looks up a command's descriptor by id, schema-table driven (§9: "a
/// code-generated OD enum with compile-time known keys" redesign direction
/// applied to commands instead of OD entries).
pub struct CommandRegistry;

impl CommandRegistry {
    pub fn find(id: CommandId) -> Option<&'static CommandDescriptor> {
        COMMANDS.iter().find(|c| c.id == id)
    }

    /// Dispatch step 1-3 of §4.2: read the command id, look up its
    /// descriptor, and decode the remaining bytes per its request schema.
    pub fn decode_request(payload: &[u8]) -> Result<Request, C3Error> {
        if payload.is_empty() {
            return Err(C3Error::BadRequest(0));
        }
        let id = CommandId(payload[0]);
        let descriptor = Self::find(id).ok_or(C3Error::UnknownCommand(id.0))?;
        let values = decode_fields(&payload[1..], descriptor.request_schema)
            .map_err(|_| C3Error::BadRequest(id.0))?;
        Ok(Request { id, values })
    }

    /// Encodes a response's typed values back into wire bytes (command id
    /// followed by each field in schema order), used by the codec's `pack`.
    pub fn encode_response(response: &Response) -> Result<Vec<u8>, C3Error> {
        let descriptor = Self::find(response.id).ok_or(C3Error::UnknownCommand(response.id.0))?;
        if response.values.len() != descriptor.response_schema.len() {
            return Err(C3Error::BadRequest(response.id.0));
        }
        let mut out = vec![response.id.0];
        for value in &response.values {
            encode_field(value, &mut out);
        }
        Ok(out)
    }
}

fn decode_fields(mut bytes: &[u8], schema: &[Field]) -> Result<Vec<Value>, ()> {
    let mut values = Vec::with_capacity(schema.len());
    for (i, field) in schema.iter().enumerate() {
        let is_last = i == schema.len() - 1;
        let value = match field {
            Field::Bool => {
                let (b, rest) = take(bytes, 1)?;
                bytes = rest;
                Value::Bool(b[0] != 0)
            }
            Field::U8 => {
                let (b, rest) = take(bytes, 1)?;
                bytes = rest;
                Value::U8(b[0])
            }
            Field::U16 => {
                let (b, rest) = take(bytes, 2)?;
                bytes = rest;
                Value::U16(u16::from_le_bytes([b[0], b[1]]))
            }
            Field::U32 => {
                let (b, rest) = take(bytes, 4)?;
                bytes = rest;
                Value::U32(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            }
            Field::Bytes => {
                if !is_last {
                    return Err(());
                }
                let v = bytes.to_vec();
                bytes = &[];
                Value::Bytes(v)
            }
        };
        values.push(value);
    }
    if !bytes.is_empty() {
        return Err(());
    }
    Ok(values)
}

fn take(bytes: &[u8], n: usize) -> Result<(&[u8], &[u8]), ()> {
    if bytes.len() < n {
        return Err(());
    }
    Ok(bytes.split_at(n))
}

fn encode_field(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Bool(v) => out.push(*v as u8),
        Value::U8(v) => out.push(*v),
        Value::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::Bytes(v) => out.extend_from_slice(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ping_request() {
        let mut payload = vec![PING.0];
        payload.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let req = CommandRegistry::decode_request(&payload).unwrap();
        assert_eq!(req.id, PING);
        assert_eq!(req.values, vec![Value::U32(0xDEAD_BEEF)]);
    }

    #[test]
    fn unknown_command_id_fails() {
        let err = CommandRegistry::decode_request(&[0xFF]).unwrap_err();
        assert_eq!(err, C3Error::UnknownCommand(0xFF));
    }

    #[test]
    fn short_payload_is_bad_request() {
        let err = CommandRegistry::decode_request(&[PING.0]).unwrap_err();
        assert_eq!(err, C3Error::BadRequest(PING.0));
    }

    #[test]
    fn round_trips_every_command_with_sample_values() {
        for descriptor in COMMANDS {
            let values: Vec<Value> = descriptor
                .request_schema
                .iter()
                .map(|f| sample_value(*f))
                .collect();
            let mut payload = vec![descriptor.id.0];
            for v in &values {
                encode_field(v, &mut payload);
            }
            let decoded = CommandRegistry::decode_request(&payload).unwrap();
            assert_eq!(decoded.values, values, "command {}", descriptor.name);
        }
    }

    fn sample_value(field: Field) -> Value {
        match field {
            Field::Bool => Value::Bool(true),
            Field::U8 => Value::U8(7),
            Field::U16 => Value::U16(700),
            Field::U32 => Value::U32(70_000),
            Field::Bytes => Value::Bytes(vec![1, 2, 3, 4]),
        }
    }

    #[test]
    fn encodes_sdo_read_response() {
        let response = Response {
            id: SDO_READ,
            values: vec![Value::U32(0), Value::U32(3), Value::Bytes(vec![1, 2, 3])],
        };
        let bytes = CommandRegistry::encode_response(&response).unwrap();
        assert_eq!(bytes[0], SDO_READ.0);
        assert_eq!(&bytes[1..5], &0u32.to_le_bytes());
        assert_eq!(&bytes[5..9], &3u32.to_le_bytes());
        assert_eq!(&bytes[9..], &[1, 2, 3]);
    }
}
