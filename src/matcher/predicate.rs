//! The predicate tree: a discriminated-union description of what to test
//! against record bytes. Trees are plain data — build them with the
//! helper constructors or deserialize them from any serde format — and
//! compile them with [`super::predicate_to_matcher`].

use serde::{Deserialize, Serialize};

use super::jump::Jump;
use super::ops::CompareOp;
use super::value::{ReturnType, TypedValue, ValueKind};

/// A literal operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    U32(u32),
    U64(u64),
}

impl Scalar {
    pub(crate) fn to_value(self) -> TypedValue {
        match self {
            Scalar::Bool(b) => TypedValue::Bool(b),
            Scalar::U32(v) => TypedValue::U32(v),
            Scalar::U64(v) => TypedValue::U64(v),
        }
    }

    pub fn return_type(self) -> ReturnType {
        self.to_value().return_type()
    }
}

/// A typed load from record bytes: jump to a position, then decode an
/// unsigned integer of the given width and endianness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueLoad {
    pub jump: Jump,
    pub kind: ValueKind,
}

/// A comparison between two sub-expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOperation {
    pub left: Expression,
    pub op: CompareOp,
    pub right: Expression,
}

/// A typed expression over record bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Scalar(Scalar),
    Value(ValueLoad),
    Binary(Box<BinaryOperation>),
}

impl Expression {
    pub fn scalar_bool(value: bool) -> Self {
        Expression::Scalar(Scalar::Bool(value))
    }

    pub fn scalar_u32(value: u32) -> Self {
        Expression::Scalar(Scalar::U32(value))
    }

    pub fn scalar_u64(value: u64) -> Self {
        Expression::Scalar(Scalar::U64(value))
    }

    /// A load of `kind` at the position `jump` resolves to.
    pub fn load(jump: Jump, kind: ValueKind) -> Self {
        Expression::Value(ValueLoad { jump, kind })
    }

    /// A load of `kind` at a literal offset.
    pub fn load_at(offset: u64, kind: ValueKind) -> Self {
        Self::load(Jump::Offset(offset), kind)
    }

    pub fn compare(left: Expression, op: CompareOp, right: Expression) -> Self {
        Expression::Binary(Box::new(BinaryOperation { left, op, right }))
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::compare(left, CompareOp::Eq, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::compare(left, CompareOp::Lt, right)
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::compare(left, CompareOp::Ge, right)
    }
}

/// A predicate: one boolean expression, or an any/all fold over several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Expression(Expression),
    /// True when at least one expression matches.
    Any(Vec<Expression>),
    /// True when every expression matches.
    All(Vec<Expression>),
}

impl Predicate {
    pub fn expression(expression: Expression) -> Self {
        Predicate::Expression(expression)
    }

    pub fn any(expressions: Vec<Expression>) -> Self {
        Predicate::Any(expressions)
    }

    pub fn all(expressions: Vec<Expression>) -> Self {
        Predicate::All(expressions)
    }
}
