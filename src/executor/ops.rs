//! Operator semantics
//!
//! Pure value-level implementations of the binary, unary, indexing and
//! iteration operations. All failures are typed exceptions; the caller
//! raises them through the vm.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::types::{BinOp, UnaryOp};
use crate::value::{normalize_big, ExcKind, ExceptionValue, Value};

type OpResult = Result<Value, ExceptionValue>;

fn type_error(message: String) -> ExceptionValue {
    ExceptionValue::new(ExcKind::TypeError, message)
}

/* ===================== Binary Operators ===================== */

pub(super) fn binary(op: BinOp, left: &Value, right: &Value) -> OpResult {
    match op {
        BinOp::Add => add(left, right),
        BinOp::Sub => arith(left, right, "-", i64::checked_sub, |a, b| a - b, |a, b| a - b),
        BinOp::Mul => mul(left, right),
        BinOp::Div => div(left, right),
        BinOp::Mod => modulo(left, right),
        BinOp::Eq => Ok(Value::Bool(left.eq_value(right))),
        BinOp::Ne => Ok(Value::Bool(!left.eq_value(right))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => compare(op, left, right),
        BinOp::In => contains(left, right),
    }
}

fn add(left: &Value, right: &Value) -> OpResult {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (Value::Bytes(a), Value::Bytes(b)) => {
            let mut out = a.clone();
            out.extend_from_slice(b);
            Ok(Value::Bytes(out))
        }
        (Value::List(a), Value::List(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::List(out))
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::Tuple(out))
        }
        _ => arith(left, right, "+", i64::checked_add, |a, b| a + b, |a, b| a + b),
    }
}

fn mul(left: &Value, right: &Value) -> OpResult {
    match (left, right) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            Ok(Value::Str(s.repeat(usize::try_from(*n).unwrap_or(0))))
        }
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
            let times = usize::try_from(*n).unwrap_or(0);
            let mut out = Vec::with_capacity(items.len() * times);
            for _ in 0..times {
                out.extend(items.iter().cloned());
            }
            Ok(Value::List(out))
        }
        _ => arith(left, right, "*", i64::checked_mul, |a, b| a * b, |a, b| a * b),
    }
}

/// Numeric arithmetic with overflow promotion: i64 first, then BigInt,
/// floats when either side is a float.
fn arith(
    left: &Value,
    right: &Value,
    symbol: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    big_op: fn(BigInt, BigInt) -> BigInt,
    float_op: fn(f64, f64) -> f64,
) -> OpResult {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(match int_op(*a, *b) {
            Some(v) => Value::Int(v),
            None => normalize_big(big_op(BigInt::from(*a), BigInt::from(*b))),
        }),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(*a, *b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_op(*a as f64, *b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_op(*a, *b as f64))),
        (Value::BigInt(a), Value::BigInt(b)) => Ok(normalize_big(big_op(a.clone(), b.clone()))),
        (Value::BigInt(a), Value::Int(b)) => {
            Ok(normalize_big(big_op(a.clone(), BigInt::from(*b))))
        }
        (Value::Int(a), Value::BigInt(b)) => {
            Ok(normalize_big(big_op(BigInt::from(*a), b.clone())))
        }
        (Value::BigInt(a), Value::Float(b)) => match a.to_f64() {
            Some(a) => Ok(Value::Float(float_op(a, *b))),
            None => Err(type_error("integer too large to combine with float".into())),
        },
        (Value::Float(a), Value::BigInt(b)) => match b.to_f64() {
            Some(b) => Ok(Value::Float(float_op(*a, b))),
            None => Err(type_error("integer too large to combine with float".into())),
        },
        _ => Err(type_error(format!(
            "unsupported operand types for {symbol}: {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn div(left: &Value, right: &Value) -> OpResult {
    let rhs_zero = match right {
        Value::Int(0) => true,
        Value::Float(f) => *f == 0.0,
        Value::BigInt(b) => b.to_f64() == Some(0.0),
        _ => false,
    };
    if is_number(left) && is_number(right) && rhs_zero {
        return Err(ExceptionValue::new(ExcKind::ZeroDivisionError, "division by zero"));
    }
    // Division always yields a float.
    match (as_f64(left), as_f64(right)) {
        (Some(a), Some(b)) => Ok(Value::Float(a / b)),
        _ => Err(type_error(format!(
            "unsupported operand types for /: {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn modulo(left: &Value, right: &Value) -> OpResult {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => {
            Err(ExceptionValue::new(ExcKind::ZeroDivisionError, "modulo by zero"))
        }
        // Result takes the sign of the divisor. The -1 divisor case is
        // special to avoid i64::MIN % -1 overflow.
        (Value::Int(_), Value::Int(-1)) => Ok(Value::Int(0)),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(((a % b) + b) % b)),
        _ => {
            let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) else {
                return Err(type_error(format!(
                    "unsupported operand types for %: {} and {}",
                    left.type_name(),
                    right.type_name()
                )));
            };
            if b == 0.0 {
                return Err(ExceptionValue::new(ExcKind::ZeroDivisionError, "modulo by zero"));
            }
            Ok(Value::Float(a - b * (a / b).floor()))
        }
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> OpResult {
    let Some(ordering) = left.cmp_value(right) else {
        return Err(type_error(format!(
            "cannot compare {} with {}",
            left.type_name(),
            right.type_name()
        )));
    };
    let outcome = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => unreachable!("compare only handles ordering operators"),
    };
    Ok(Value::Bool(outcome))
}

fn contains(needle: &Value, haystack: &Value) -> OpResult {
    match haystack {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
            Ok(Value::Bool(items.iter().any(|item| item.eq_value(needle))))
        }
        Value::Dict(pairs) => Ok(Value::Bool(pairs.iter().any(|(k, _)| k.eq_value(needle)))),
        Value::Str(s) => match needle {
            Value::Str(sub) => Ok(Value::Bool(s.contains(sub.as_str()))),
            _ => Err(type_error(format!(
                "'in <str>' requires str, not {}",
                needle.type_name()
            ))),
        },
        Value::Bytes(bytes) => match needle {
            Value::Int(b) => Ok(Value::Bool(
                u8::try_from(*b).map_or(false, |b| bytes.contains(&b)),
            )),
            _ => Err(type_error(format!(
                "'in <bytes>' requires int, not {}",
                needle.type_name()
            ))),
        },
        _ => Err(type_error(format!(
            "argument of type {} is not iterable",
            haystack.type_name()
        ))),
    }
}

/* ===================== Unary Operators ===================== */

pub(super) fn unary(op: UnaryOp, operand: &Value) -> OpResult {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg => match operand {
            Value::Int(i) => Ok(match i.checked_neg() {
                Some(v) => Value::Int(v),
                None => normalize_big(-BigInt::from(*i)),
            }),
            Value::BigInt(b) => Ok(normalize_big(-b.clone())),
            Value::Float(f) => Ok(Value::Float(-f)),
            _ => Err(type_error(format!(
                "bad operand type for unary -: {}",
                operand.type_name()
            ))),
        },
    }
}

/* ===================== Indexing ===================== */

pub(super) fn index_get(object: &Value, index: &Value) -> OpResult {
    match object {
        Value::List(items) | Value::Tuple(items) => {
            let i = seq_index(index, items.len(), object.type_name())?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = seq_index(index, chars.len(), "str")?;
            Ok(Value::Str(chars[i].to_string()))
        }
        Value::Bytes(bytes) => {
            let i = seq_index(index, bytes.len(), "bytes")?;
            Ok(Value::Int(bytes[i] as i64))
        }
        Value::Dict(pairs) => pairs
            .iter()
            .find(|(k, _)| k.eq_value(index))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| ExceptionValue::new(ExcKind::KeyError, index.repr())),
        _ => Err(type_error(format!(
            "{} is not subscriptable",
            object.type_name()
        ))),
    }
}

/// Store into a container, returning the updated container. Bindings are
/// values, so the caller rebinds the result.
pub(super) fn index_set(object: Value, index: &Value, value: Value) -> OpResult {
    match object {
        Value::List(mut items) => {
            let i = seq_index(index, items.len(), "list")?;
            items[i] = value;
            Ok(Value::List(items))
        }
        Value::Dict(mut pairs) => {
            match pairs.iter_mut().find(|(k, _)| k.eq_value(index)) {
                Some((_, slot)) => *slot = value,
                None => pairs.push((index.clone(), value)),
            }
            Ok(Value::Dict(pairs))
        }
        other => Err(type_error(format!(
            "{} does not support item assignment",
            other.type_name()
        ))),
    }
}

/// Resolve a (possibly negative) sequence index.
fn seq_index(index: &Value, len: usize, kind: &str) -> Result<usize, ExceptionValue> {
    let raw = match index {
        Value::Int(i) => *i,
        _ => {
            return Err(type_error(format!(
                "{kind} indices must be int, not {}",
                index.type_name()
            )))
        }
    };
    let adjusted = if raw < 0 { raw + len as i64 } else { raw };
    if adjusted < 0 || adjusted as usize >= len {
        return Err(ExceptionValue::new(
            ExcKind::IndexError,
            format!("{kind} index out of range"),
        ));
    }
    Ok(adjusted as usize)
}

/* ===================== Iteration ===================== */

/// Materialize the items a `for` loop (or a container constructor) walks.
pub(super) fn iter_values(value: &Value) -> Result<Vec<Value>, ExceptionValue> {
    match value {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items.clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Bytes(bytes) => Ok(bytes.iter().map(|b| Value::Int(*b as i64)).collect()),
        Value::Dict(pairs) => Ok(pairs.iter().map(|(k, _)| k.clone()).collect()),
        _ => Err(type_error(format!(
            "{} is not iterable",
            value.type_name()
        ))),
    }
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::BigInt(_) | Value::Float(_))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::BigInt(b) => b.to_f64(),
        _ => None,
    }
}
