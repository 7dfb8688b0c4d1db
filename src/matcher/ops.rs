//! Comparison operators over typed values. Operands arrive already
//! promoted to a shared width; every comparison yields a boolean.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::value::TypedValue;

/// Comparison operator of a binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Applies a comparison to a promoted operand pair.
pub(crate) fn apply(op: CompareOp, left: TypedValue, right: TypedValue) -> bool {
    let ordering = compare(left, right);
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

fn compare(left: TypedValue, right: TypedValue) -> Ordering {
    match (left, right) {
        (TypedValue::Bool(a), TypedValue::Bool(b)) => (a as u8).cmp(&(b as u8)),
        (TypedValue::U8(a), TypedValue::U8(b)) => a.cmp(&b),
        (TypedValue::U16(a), TypedValue::U16(b)) => a.cmp(&b),
        (TypedValue::U32(a), TypedValue::U32(b)) => a.cmp(&b),
        (TypedValue::U64(a), TypedValue::U64(b)) => a.cmp(&b),
        // Mixed widths zero-extend, which preserves unsigned order.
        (a, b) => a.as_u64().cmp(&b.as_u64()),
    }
}
