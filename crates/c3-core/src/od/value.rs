//! Typed tagged union for Object Dictionary values.
//!
//! Every supported scalar type gets its own variant; encode/decode is
//! table-driven off the existing value acting as a type template, the same
//! pattern the teacher uses for its own `ObjectValue`.

use crate::error::C3Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    VisibleString(String),
    Bytes(Vec<u8>),
}

impl ObjectValue {
    /// Serializes the inner value into a little-endian byte vector.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            ObjectValue::Bool(v) => vec![*v as u8],
            ObjectValue::I8(v) => v.to_le_bytes().to_vec(),
            ObjectValue::I16(v) => v.to_le_bytes().to_vec(),
            ObjectValue::I32(v) => v.to_le_bytes().to_vec(),
            ObjectValue::I64(v) => v.to_le_bytes().to_vec(),
            ObjectValue::U8(v) => v.to_le_bytes().to_vec(),
            ObjectValue::U16(v) => v.to_le_bytes().to_vec(),
            ObjectValue::U32(v) => v.to_le_bytes().to_vec(),
            ObjectValue::U64(v) => v.to_le_bytes().to_vec(),
            ObjectValue::F32(v) => v.to_le_bytes().to_vec(),
            ObjectValue::F64(v) => v.to_le_bytes().to_vec(),
            ObjectValue::VisibleString(v) => v.as_bytes().to_vec(),
            ObjectValue::Bytes(v) => v.clone(),
        }
    }

    /// Deserializes a byte slice into a new `ObjectValue`, using an existing
    /// `ObjectValue` as a type template. `index` is only used to annotate
    /// the error with which entry failed.
    pub fn deserialize(data: &[u8], type_template: &ObjectValue, index: u16) -> Result<ObjectValue, C3Error> {
        macro_rules! deserialize_fixed {
            ($variant:path, $type:ty) => {
                data.try_into()
                    .map(|bytes| $variant(<$type>::from_le_bytes(bytes)))
                    .map_err(|_| C3Error::TypeMismatch(index))
            };
        }

        match type_template {
            ObjectValue::Bool(_) => {
                if data.len() != 1 {
                    return Err(C3Error::TypeMismatch(index));
                }
                Ok(ObjectValue::Bool(data[0] != 0))
            }
            ObjectValue::I8(_) => deserialize_fixed!(ObjectValue::I8, i8),
            ObjectValue::I16(_) => deserialize_fixed!(ObjectValue::I16, i16),
            ObjectValue::I32(_) => deserialize_fixed!(ObjectValue::I32, i32),
            ObjectValue::I64(_) => deserialize_fixed!(ObjectValue::I64, i64),
            ObjectValue::U8(_) => deserialize_fixed!(ObjectValue::U8, u8),
            ObjectValue::U16(_) => deserialize_fixed!(ObjectValue::U16, u16),
            ObjectValue::U32(_) => deserialize_fixed!(ObjectValue::U32, u32),
            ObjectValue::U64(_) => deserialize_fixed!(ObjectValue::U64, u64),
            ObjectValue::F32(_) => deserialize_fixed!(ObjectValue::F32, f32),
            ObjectValue::F64(_) => deserialize_fixed!(ObjectValue::F64, f64),
            ObjectValue::VisibleString(_) => Ok(ObjectValue::VisibleString(
                String::from_utf8(data.to_vec()).map_err(|_| C3Error::TypeMismatch(index))?,
            )),
            ObjectValue::Bytes(_) => Ok(ObjectValue::Bytes(data.to_vec())),
        }
    }

    /// The encoded size in bytes of this value, used by the persistent-state
    /// layer to compute position-defined offsets (§4.7). Variable-length
    /// variants report their *current* length.
    pub fn encoded_len(&self) -> usize {
        self.serialize().len()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ObjectValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            ObjectValue::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            ObjectValue::U16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ObjectValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ObjectValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_scalar_variant() {
        let samples = vec![
            ObjectValue::Bool(true),
            ObjectValue::I8(-5),
            ObjectValue::I16(-1000),
            ObjectValue::I32(-100_000),
            ObjectValue::I64(-1_000_000_000_000),
            ObjectValue::U8(200),
            ObjectValue::U16(40_000),
            ObjectValue::U32(3_000_000_000),
            ObjectValue::U64(10_000_000_000_000_000_000),
            ObjectValue::F32(1.5),
            ObjectValue::F64(2.5),
            ObjectValue::VisibleString("ORESAT".to_string()),
            ObjectValue::Bytes(vec![1, 2, 3]),
        ];
        for v in samples {
            let bytes = v.serialize();
            let decoded = ObjectValue::deserialize(&bytes, &v, 0).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn rejects_wrong_length_fixed_width() {
        let template = ObjectValue::U32(0);
        let err = ObjectValue::deserialize(&[1, 2, 3], &template, 0x2010).unwrap_err();
        assert_eq!(err, C3Error::TypeMismatch(0x2010));
    }
}
