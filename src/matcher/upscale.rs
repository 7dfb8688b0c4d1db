//! Width promotion for binary operations. Before two sides are compared
//! they are lifted to a common width type: equal types pass through,
//! `bool` lifts to any unsigned width, and narrower unsigned integers
//! zero-extend to wider ones. The dispatch is a constant match over the
//! closed type set; there is no runtime registry.

use super::compile::CompileError;
use super::value::{ReturnType, TypedValue};

/// Lifts one side of a binary operation to the common width type.
pub type UpscaleFn = fn(TypedValue) -> TypedValue;

fn identity(value: TypedValue) -> TypedValue {
    value
}

fn to_u8(value: TypedValue) -> TypedValue {
    TypedValue::U8(value.as_u64() as u8)
}

fn to_u16(value: TypedValue) -> TypedValue {
    TypedValue::U16(value.as_u64() as u16)
}

fn to_u32(value: TypedValue) -> TypedValue {
    TypedValue::U32(value.as_u64() as u32)
}

fn to_u64(value: TypedValue) -> TypedValue {
    TypedValue::U64(value.as_u64())
}

/// The widening conversion from `from` to `to`, if one exists. Only
/// strictly-widening pairs are present; there is no narrowing.
fn widening(from: ReturnType, to: ReturnType) -> Option<UpscaleFn> {
    use ReturnType::*;
    match (from, to) {
        (Bool, U8) => Some(to_u8),
        (Bool, U16) | (U8, U16) => Some(to_u16),
        (Bool, U32) | (U8, U32) | (U16, U32) => Some(to_u32),
        (Bool, U64) | (U8, U64) | (U16, U64) | (U32, U64) => Some(to_u64),
        _ => None,
    }
}

/// Returns the pair of functions that lift a left and right operand to a
/// shared width type, plus that type.
pub fn upscaler(
    left: ReturnType,
    right: ReturnType,
) -> Result<(UpscaleFn, UpscaleFn, ReturnType), CompileError> {
    // Same types, no conversion required.
    if left == right {
        return Ok((identity, identity, left));
    }
    if let Some(up) = widening(left, right) {
        return Ok((up, identity, right));
    }
    if let Some(up) = widening(right, left) {
        return Ok((identity, up, left));
    }
    Err(CompileError::Unscalable(left, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_types_are_identity_on_both_sides() {
        for ty in [
            ReturnType::Bool,
            ReturnType::U8,
            ReturnType::U16,
            ReturnType::U32,
            ReturnType::U64,
        ] {
            let (up_left, up_right, common) = upscaler(ty, ty).unwrap();
            assert_eq!(common, ty);
            assert_eq!(up_left(TypedValue::U8(7)), TypedValue::U8(7));
            assert_eq!(up_right(TypedValue::U64(7)), TypedValue::U64(7));
        }
    }

    #[test]
    fn bool_lifts_to_every_unsigned_width() {
        let (up_left, _, common) = upscaler(ReturnType::Bool, ReturnType::U8).unwrap();
        assert_eq!(common, ReturnType::U8);
        assert_eq!(up_left(TypedValue::Bool(true)), TypedValue::U8(1));
        assert_eq!(up_left(TypedValue::Bool(false)), TypedValue::U8(0));

        let (up_left, _, common) = upscaler(ReturnType::Bool, ReturnType::U64).unwrap();
        assert_eq!(common, ReturnType::U64);
        assert_eq!(up_left(TypedValue::Bool(true)), TypedValue::U64(1));
    }

    #[test]
    fn narrower_side_zero_extends() {
        let (up_left, up_right, common) = upscaler(ReturnType::U16, ReturnType::U64).unwrap();
        assert_eq!(common, ReturnType::U64);
        assert_eq!(up_left(TypedValue::U16(0xBEEF)), TypedValue::U64(0xBEEF));
        assert_eq!(up_right(TypedValue::U64(1)), TypedValue::U64(1));

        // The wider side can be on the left too.
        let (up_left, up_right, common) = upscaler(ReturnType::U64, ReturnType::U32).unwrap();
        assert_eq!(common, ReturnType::U64);
        assert_eq!(up_left(TypedValue::U64(5)), TypedValue::U64(5));
        assert_eq!(up_right(TypedValue::U32(9)), TypedValue::U64(9));
    }

    #[test]
    fn promotion_preserves_integer_values() {
        let (up_left, _, _) = upscaler(ReturnType::U8, ReturnType::U64).unwrap();
        assert_eq!(up_left(TypedValue::U8(u8::MAX)), TypedValue::U64(255));

        let (up_left, _, _) = upscaler(ReturnType::U32, ReturnType::U64).unwrap();
        assert_eq!(
            up_left(TypedValue::U32(u32::MAX)),
            TypedValue::U64(u32::MAX as u64)
        );
    }
}
