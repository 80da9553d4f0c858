//! Replays the pool rotation predicate. The obfuscated bootstrap shifts the
//! pool head-to-tail until an arithmetic probe over decoded entries reaches a
//! shipped stop value; this module lifts that probe into a tree and runs the
//! same loop offline.

use alembic_core::ast::{BinaryOp, Node, UnaryOp};
use alembic_core::{matcher, Ast, NodeId};
use rustc_hash::FxHashMap;

use super::decoder::{DecodeArg, Decoder};
use crate::{Error, Result};

/// Arithmetic the rotation predicate is allowed to perform.
#[derive(Debug, Clone, Copy)]
pub enum RotationOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// A rotation predicate lifted into a replayable tree.
#[derive(Debug)]
pub enum Operation {
    Number(f64),
    Negate(Box<Operation>),
    Binary {
        op: RotationOp,
        left: Box<Operation>,
        right: Box<Operation>,
    },
    /// `parseInt(<wrapper>(args))`, holding the wrapper's decoder slot.
    Call {
        decoder: usize,
        args: Vec<DecodeArg>,
    },
}

/// Lifts a predicate expression into an [`Operation`] tree. `slots` maps
/// wrapper names to positions in the decoder list. Anything outside the
/// shapes the bootstrap emits is an error.
pub fn parse_operation(
    ast: &Ast,
    node: NodeId,
    slots: &FxHashMap<String, usize>,
) -> Result<Operation> {
    match ast.node(node) {
        Node::NumberLiteral { value } => Ok(Operation::Number(*value)),
        Node::Unary {
            op: UnaryOp::Minus,
            argument,
        } => Ok(Operation::Negate(Box::new(parse_operation(
            ast, *argument, slots,
        )?))),
        Node::Unary { op, .. } => Err(unsupported(format!("unary operator {op:?}"))),
        Node::Binary { op, left, right } => {
            let op = match op {
                BinaryOp::Add => RotationOp::Add,
                BinaryOp::Sub => RotationOp::Sub,
                BinaryOp::Mul => RotationOp::Mul,
                BinaryOp::Div => RotationOp::Div,
                BinaryOp::Mod => RotationOp::Mod,
                other => return Err(unsupported(format!("operator {other:?}"))),
            };
            Ok(Operation::Binary {
                op,
                left: Box::new(parse_operation(ast, *left, slots)?),
                right: Box::new(parse_operation(ast, *right, slots)?),
            })
        }
        Node::Call { callee, arguments } => parse_call(ast, *callee, arguments, slots),
        other => Err(unsupported(other.kind_name().to_string())),
    }
}

fn parse_call(
    ast: &Ast,
    callee: NodeId,
    arguments: &[NodeId],
    slots: &FxHashMap<String, usize>,
) -> Result<Operation> {
    if !matcher::is_identifier_named(ast, callee, "parseInt") || arguments.len() != 1 {
        return Err(unsupported("call shape".to_string()));
    }
    let Node::Call {
        callee: wrapper,
        arguments: wrapper_args,
    } = ast.node(arguments[0])
    else {
        return Err(unsupported("parseInt argument".to_string()));
    };
    let name = matcher::identifier_name(ast, *wrapper)
        .ok_or_else(|| unsupported("wrapper callee".to_string()))?;
    let decoder = *slots
        .get(name)
        .ok_or_else(|| unsupported(format!("wrapper name {name}")))?;
    let mut args = Vec::with_capacity(wrapper_args.len());
    for &arg in wrapper_args {
        args.push(decode_arg(ast, arg)?);
    }
    Ok(Operation::Call { decoder, args })
}

fn decode_arg(ast: &Ast, node: NodeId) -> Result<DecodeArg> {
    match ast.node(node) {
        Node::NumberLiteral { value } => Ok(DecodeArg::Num(*value)),
        Node::StringLiteral { value, .. } => Ok(DecodeArg::Str(value.clone())),
        Node::Unary {
            op: UnaryOp::Minus,
            argument,
        } => match ast.node(*argument) {
            Node::NumberLiteral { value } => Ok(DecodeArg::Num(-value)),
            _ => Err(unsupported("wrapper argument".to_string())),
        },
        _ => Err(unsupported("wrapper argument".to_string())),
    }
}

fn unsupported(what: String) -> Error {
    Error::RotationExpression(what)
}

/// Shifts the pool head-to-tail until the predicate reaches `stop`, erroring
/// out once the shift budget is spent.
pub fn rotate_pool(
    pool: &mut Vec<String>,
    operation: &Operation,
    decoders: &mut [Decoder],
    stop: f64,
) -> Result<()> {
    let mut shifts = 0u32;
    loop {
        let settled = match apply_operation(operation, pool, decoders) {
            Some(value) => value == stop,
            None => false,
        };
        if settled {
            return Ok(());
        }
        if !pool.is_empty() {
            pool.rotate_left(1);
        }
        shifts += 1;
        if shifts > 100_000 {
            return Err(Error::RotationBudget);
        }
    }
}

/// One evaluation of the predicate. `None` mirrors a thrown error, which the
/// rotation loop treats the same as a miss.
fn apply_operation(operation: &Operation, pool: &[String], decoders: &mut [Decoder]) -> Option<f64> {
    match operation {
        Operation::Number(value) => Some(*value),
        Operation::Negate(inner) => Some(-apply_operation(inner, pool, decoders)?),
        Operation::Binary { op, left, right } => {
            let left = apply_operation(left, pool, decoders)?;
            let right = apply_operation(right, pool, decoders)?;
            Some(match op {
                RotationOp::Add => left + right,
                RotationOp::Sub => left - right,
                RotationOp::Mul => left * right,
                RotationOp::Div => left / right,
                RotationOp::Mod => left % right,
            })
        }
        Operation::Call { decoder, args } => {
            let value = decoders
                .get_mut(*decoder)?
                .get_string_for_rotation(pool, args)?;
            Some(js_parse_int(&value))
        }
    }
}

/// `parseInt` over a decoded entry: leading whitespace and sign, an optional
/// hex prefix, then the longest digit run, or NaN.
fn js_parse_int(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (radix, digits) = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        Some(hex) => (16u32, hex),
        None => (10u32, rest),
    };
    let mut value = f64::NAN;
    for ch in digits.chars() {
        let Some(digit) = ch.to_digit(radix) else {
            break;
        };
        value = if value.is_nan() { 0.0 } else { value };
        value = value * radix as f64 + digit as f64;
    }
    sign * value
}
