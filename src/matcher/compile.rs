//! Compilation of predicate trees into matchers. The walk happens once:
//! scalar nodes become constants, value nodes capture their jump and
//! decoder, and binary nodes resolve the upscaler pair for their operand
//! types. Evaluation then runs over record bytes with no further type
//! dispatch decisions.

use thiserror::Error;

use super::jump::Jump;
use super::ops::{self, CompareOp};
use super::predicate::{Expression, Predicate};
use super::upscale::{upscaler, UpscaleFn};
use super::value::{ReturnType, TypedValue, ValueKind};
use super::MatchError;

/// Errors produced while compiling a predicate into a matcher.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CompileError {
    /// The root of a matcher expression must evaluate to a boolean.
    #[error("expression is not a boolean expression (evaluates to {0:?})")]
    NotBoolean(ReturnType),

    /// The two sides of a binary operation have no promotion path.
    #[error("cannot upscale {0:?} to {1:?}")]
    Unscalable(ReturnType, ReturnType),
}

/// A compiled expression node.
#[derive(Debug)]
enum Eval {
    Scalar(TypedValue),
    Load {
        jump: Jump,
        kind: ValueKind,
    },
    Binary {
        op: CompareOp,
        left: Box<Eval>,
        right: Box<Eval>,
        upscale_left: UpscaleFn,
        upscale_right: UpscaleFn,
    },
}

impl Eval {
    fn eval(&self, bytes: &[u8]) -> Result<TypedValue, MatchError> {
        match self {
            Eval::Scalar(value) => Ok(*value),
            Eval::Load { jump, kind } => {
                let jumped = jump.apply(bytes)?;
                kind.decode(jumped)
            }
            Eval::Binary {
                op,
                left,
                right,
                upscale_left,
                upscale_right,
            } => {
                let left_value = upscale_left(left.eval(bytes)?);
                let right_value = upscale_right(right.eval(bytes)?);
                Ok(TypedValue::Bool(ops::apply(*op, left_value, right_value)))
            }
        }
    }
}

/// A compiled predicate, ready to test byte buffers.
#[derive(Debug)]
pub enum Matcher {
    /// A single boolean expression.
    Expression(CompiledExpression),
    /// True iff every matcher is true; the first error wins.
    All(Vec<Matcher>),
    /// True as soon as one matcher is true, even if a later one would
    /// have errored.
    Any(Vec<Matcher>),
    /// True when the record has at least this many bytes.
    Len(usize),
    /// Matches every record.
    Anything,
    /// Matches no record.
    Nothing,
}

/// A compiled boolean expression; only constructed by compilation, so
/// its root is guaranteed to evaluate to a boolean.
#[derive(Debug)]
pub struct CompiledExpression {
    eval: Eval,
}

impl Matcher {
    /// Returns whether the record bytes satisfy this matcher.
    pub fn matches(&self, bytes: &[u8]) -> Result<bool, MatchError> {
        match self {
            Matcher::Expression(compiled) => match compiled.eval.eval(bytes)? {
                TypedValue::Bool(matched) => Ok(matched),
                // INVARIANT: compilation rejects non-boolean roots.
                other => unreachable!("boolean expression evaluated to {other:?}"),
            },
            Matcher::All(matchers) => {
                for matcher in matchers {
                    if !matcher.matches(bytes)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Matcher::Any(matchers) => {
                for matcher in matchers {
                    if matcher.matches(bytes)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Matcher::Len(min_length) => Ok(bytes.len() >= *min_length),
            Matcher::Anything => Ok(true),
            Matcher::Nothing => Ok(false),
        }
    }
}

/// Compiles a predicate tree into a matcher.
pub fn predicate_to_matcher(predicate: &Predicate) -> Result<Matcher, CompileError> {
    match predicate {
        Predicate::Expression(expression) => {
            Ok(Matcher::Expression(compile_boolean(expression)?))
        }
        Predicate::Any(expressions) => Ok(Matcher::Any(compile_all(expressions)?)),
        Predicate::All(expressions) => Ok(Matcher::All(compile_all(expressions)?)),
    }
}

fn compile_all(expressions: &[Expression]) -> Result<Vec<Matcher>, CompileError> {
    expressions
        .iter()
        .map(|expression| Ok(Matcher::Expression(compile_boolean(expression)?)))
        .collect()
}

fn compile_boolean(expression: &Expression) -> Result<CompiledExpression, CompileError> {
    let (eval, return_type) = compile_expression(expression)?;
    if return_type != ReturnType::Bool {
        return Err(CompileError::NotBoolean(return_type));
    }
    Ok(CompiledExpression { eval })
}

fn compile_expression(expression: &Expression) -> Result<(Eval, ReturnType), CompileError> {
    match expression {
        Expression::Scalar(scalar) => {
            let value = scalar.to_value();
            Ok((Eval::Scalar(value), value.return_type()))
        }
        Expression::Value(load) => Ok((
            Eval::Load {
                jump: load.jump,
                kind: load.kind,
            },
            load.kind.return_type(),
        )),
        Expression::Binary(operation) => {
            let (left, left_type) = compile_expression(&operation.left)?;
            let (right, right_type) = compile_expression(&operation.right)?;
            let (upscale_left, upscale_right, _common) = upscaler(left_type, right_type)?;
            // Comparison operators always yield a boolean.
            Ok((
                Eval::Binary {
                    op: operation.op,
                    left: Box::new(left),
                    right: Box::new(right),
                    upscale_left,
                    upscale_right,
                },
                ReturnType::Bool,
            ))
        }
    }
}
