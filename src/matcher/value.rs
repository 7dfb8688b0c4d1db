//! Typed runtime values and the width/endianness decoders that produce
//! them from record bytes.

use serde::{Deserialize, Serialize};

use super::MatchError;

/// The width type an expression evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Bool,
    U8,
    U16,
    U32,
    U64,
}

/// A value tagged with its width type. Comparisons and promotions stay
/// on the stack; no variant boxes its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
}

impl TypedValue {
    pub fn return_type(self) -> ReturnType {
        match self {
            TypedValue::Bool(_) => ReturnType::Bool,
            TypedValue::U8(_) => ReturnType::U8,
            TypedValue::U16(_) => ReturnType::U16,
            TypedValue::U32(_) => ReturnType::U32,
            TypedValue::U64(_) => ReturnType::U64,
        }
    }

    /// The value zero-extended to 64 bits; booleans read as 0 or 1.
    pub(crate) fn as_u64(self) -> u64 {
        match self {
            TypedValue::Bool(b) => b as u64,
            TypedValue::U8(v) => v as u64,
            TypedValue::U16(v) => v as u64,
            TypedValue::U32(v) => v as u64,
            TypedValue::U64(v) => v,
        }
    }
}

/// Width and byte order of an unsigned-integer load from record bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    U8,
    U16Le,
    U16Be,
    U32Le,
    U32Be,
    U64Le,
    U64Be,
}

impl ValueKind {
    pub fn return_type(self) -> ReturnType {
        match self {
            ValueKind::U8 => ReturnType::U8,
            ValueKind::U16Le | ValueKind::U16Be => ReturnType::U16,
            ValueKind::U32Le | ValueKind::U32Be => ReturnType::U32,
            ValueKind::U64Le | ValueKind::U64Be => ReturnType::U64,
        }
    }

    /// Number of bytes this load consumes.
    pub fn width(self) -> usize {
        match self {
            ValueKind::U8 => 1,
            ValueKind::U16Le | ValueKind::U16Be => 2,
            ValueKind::U32Le | ValueKind::U32Be => 4,
            ValueKind::U64Le | ValueKind::U64Be => 8,
        }
    }

    /// Decodes the leading bytes of `bytes` as this kind of integer.
    pub fn decode(self, bytes: &[u8]) -> Result<TypedValue, MatchError> {
        if bytes.len() < self.width() {
            return Err(MatchError::BytesTooSmall);
        }
        Ok(match self {
            ValueKind::U8 => TypedValue::U8(bytes[0]),
            ValueKind::U16Le => {
                let mut buf = [0u8; 2];
                buf.copy_from_slice(&bytes[..2]);
                TypedValue::U16(u16::from_le_bytes(buf))
            }
            ValueKind::U16Be => {
                let mut buf = [0u8; 2];
                buf.copy_from_slice(&bytes[..2]);
                TypedValue::U16(u16::from_be_bytes(buf))
            }
            ValueKind::U32Le => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(&bytes[..4]);
                TypedValue::U32(u32::from_le_bytes(buf))
            }
            ValueKind::U32Be => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(&bytes[..4]);
                TypedValue::U32(u32::from_be_bytes(buf))
            }
            ValueKind::U64Le => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[..8]);
                TypedValue::U64(u64::from_le_bytes(buf))
            }
            ValueKind::U64Be => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[..8]);
                TypedValue::U64(u64::from_be_bytes(buf))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_respects_width_and_endianness() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

        assert_eq!(ValueKind::U8.decode(&bytes).unwrap(), TypedValue::U8(0x01));
        assert_eq!(
            ValueKind::U16Le.decode(&bytes).unwrap(),
            TypedValue::U16(0x0201)
        );
        assert_eq!(
            ValueKind::U16Be.decode(&bytes).unwrap(),
            TypedValue::U16(0x0102)
        );
        assert_eq!(
            ValueKind::U32Le.decode(&bytes).unwrap(),
            TypedValue::U32(0x04030201)
        );
        assert_eq!(
            ValueKind::U32Be.decode(&bytes).unwrap(),
            TypedValue::U32(0x01020304)
        );
        assert_eq!(
            ValueKind::U64Le.decode(&bytes).unwrap(),
            TypedValue::U64(0x0807060504030201)
        );
        assert_eq!(
            ValueKind::U64Be.decode(&bytes).unwrap(),
            TypedValue::U64(0x0102030405060708)
        );
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let bytes = [0xFF, 0x00, 0xAB, 0xCD];

        assert_eq!(
            ValueKind::U16Le.decode(&bytes).unwrap(),
            TypedValue::U16(0x00FF)
        );
    }

    #[test]
    fn decode_short_buffer_fails() {
        assert_eq!(ValueKind::U8.decode(&[]), Err(MatchError::BytesTooSmall));
        assert_eq!(
            ValueKind::U16Le.decode(&[1]),
            Err(MatchError::BytesTooSmall)
        );
        assert_eq!(
            ValueKind::U32Be.decode(&[1, 2, 3]),
            Err(MatchError::BytesTooSmall)
        );
        assert_eq!(
            ValueKind::U64Le.decode(&[1, 2, 3, 4, 5, 6, 7]),
            Err(MatchError::BytesTooSmall)
        );
    }

    #[test]
    fn return_types_track_width() {
        assert_eq!(ValueKind::U8.return_type(), ReturnType::U8);
        assert_eq!(ValueKind::U16Be.return_type(), ReturnType::U16);
        assert_eq!(ValueKind::U32Le.return_type(), ReturnType::U32);
        assert_eq!(ValueKind::U64Be.return_type(), ReturnType::U64);
        assert_eq!(TypedValue::Bool(true).return_type(), ReturnType::Bool);
        assert_eq!(TypedValue::U32(1).return_type(), ReturnType::U32);
    }

    #[test]
    fn as_u64_zero_extends() {
        assert_eq!(TypedValue::Bool(true).as_u64(), 1);
        assert_eq!(TypedValue::Bool(false).as_u64(), 0);
        assert_eq!(TypedValue::U8(0xFF).as_u64(), 0xFF);
        assert_eq!(TypedValue::U32(0xFFFF_FFFF).as_u64(), 0xFFFF_FFFF);
    }
}
