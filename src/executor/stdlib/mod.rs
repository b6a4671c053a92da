//! Builtin functions
//!
//! Pure builtins dispatched by name at call resolution. `gather` is
//! listed here so name resolution finds it, but its evaluation lives in
//! the expression machinery because it can suspend on futures.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use super::ops::iter_values;
use crate::value::{normalize_big, ExcKind, ExceptionValue, Value};

pub mod methods;

/// The closed set of builtin functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Builtin {
    Len,
    Str,
    Repr,
    Int,
    Float,
    Bool,
    List,
    Tuple,
    Set,
    Dict,
    Bytes,
    Path,
    Range,
    Abs,
    Type,
    /// Await several futures at once; handled by the engine.
    Gather,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Set => "set",
            Builtin::Dict => "dict",
            Builtin::Bytes => "bytes",
            Builtin::Path => "path",
            Builtin::Range => "range",
            Builtin::Abs => "abs",
            Builtin::Type => "type",
            Builtin::Gather => "gather",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "len" => Builtin::Len,
            "str" => Builtin::Str,
            "repr" => Builtin::Repr,
            "int" => Builtin::Int,
            "float" => Builtin::Float,
            "bool" => Builtin::Bool,
            "list" => Builtin::List,
            "tuple" => Builtin::Tuple,
            "set" => Builtin::Set,
            "dict" => Builtin::Dict,
            "bytes" => Builtin::Bytes,
            "path" => Builtin::Path,
            "range" => Builtin::Range,
            "abs" => Builtin::Abs,
            "type" => Builtin::Type,
            "gather" => Builtin::Gather,
            _ => return None,
        })
    }
}

type BuiltinResult = Result<Value, ExceptionValue>;

fn type_error(message: String) -> ExceptionValue {
    ExceptionValue::new(ExcKind::TypeError, message)
}

fn value_error(message: String) -> ExceptionValue {
    ExceptionValue::new(ExcKind::ValueError, message)
}

fn arity(builtin: Builtin, args: &[Value], min: usize, max: usize) -> Result<(), ExceptionValue> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{min}")
        } else {
            format!("{min} to {max}")
        };
        return Err(type_error(format!(
            "{}() takes {expected} arguments, got {}",
            builtin.name(),
            args.len()
        )));
    }
    Ok(())
}

/// Evaluate a pure builtin. `gather` never reaches this function.
pub(crate) fn call_builtin(builtin: Builtin, args: &[Value]) -> BuiltinResult {
    match builtin {
        Builtin::Len => {
            arity(builtin, args, 1, 1)?;
            let len = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::Bytes(b) => b.len(),
                Value::List(v) | Value::Tuple(v) | Value::Set(v) => v.len(),
                Value::Dict(pairs) => pairs.len(),
                other => {
                    return Err(type_error(format!(
                        "object of type {} has no len()",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Int(len as i64))
        }
        Builtin::Str => {
            arity(builtin, args, 1, 1)?;
            Ok(Value::Str(args[0].to_display_string()))
        }
        Builtin::Repr => {
            arity(builtin, args, 1, 1)?;
            Ok(Value::Str(args[0].repr()))
        }
        Builtin::Int => {
            arity(builtin, args, 1, 1)?;
            to_int(&args[0])
        }
        Builtin::Float => {
            arity(builtin, args, 1, 1)?;
            to_float(&args[0])
        }
        Builtin::Bool => {
            arity(builtin, args, 1, 1)?;
            Ok(Value::Bool(args[0].is_truthy()))
        }
        Builtin::List => {
            arity(builtin, args, 0, 1)?;
            match args.first() {
                None => Ok(Value::List(Vec::new())),
                Some(v) => Ok(Value::List(iter_values(v)?)),
            }
        }
        Builtin::Tuple => {
            arity(builtin, args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Tuple(Vec::new())),
                Some(v) => Ok(Value::Tuple(iter_values(v)?)),
            }
        }
        Builtin::Set => {
            arity(builtin, args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Set(Vec::new())),
                Some(v) => {
                    let mut out: Vec<Value> = Vec::new();
                    for item in iter_values(v)? {
                        if !out.iter().any(|existing| existing.eq_value(&item)) {
                            out.push(item);
                        }
                    }
                    Ok(Value::Set(out))
                }
            }
        }
        Builtin::Dict => {
            arity(builtin, args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Dict(Vec::new())),
                Some(Value::Dict(pairs)) => Ok(Value::Dict(pairs.clone())),
                Some(v) => {
                    let mut out: Vec<(Value, Value)> = Vec::new();
                    for item in iter_values(v)? {
                        let pair = match item {
                            Value::List(kv) | Value::Tuple(kv) if kv.len() == 2 => {
                                (kv[0].clone(), kv[1].clone())
                            }
                            other => {
                                return Err(value_error(format!(
                                    "dict() expects [key, value] pairs, got {}",
                                    other.type_name()
                                )))
                            }
                        };
                        match out.iter_mut().find(|(k, _)| k.eq_value(&pair.0)) {
                            Some((_, slot)) => *slot = pair.1,
                            None => out.push(pair),
                        }
                    }
                    Ok(Value::Dict(out))
                }
            }
        }
        Builtin::Bytes => {
            arity(builtin, args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Bytes(Vec::new())),
                Some(Value::Bytes(b)) => Ok(Value::Bytes(b.clone())),
                Some(Value::Str(s)) => Ok(Value::Bytes(s.as_bytes().to_vec())),
                Some(v) => {
                    let mut out = Vec::new();
                    for item in iter_values(v)? {
                        match item {
                            Value::Int(b) if (0..=255).contains(&b) => out.push(b as u8),
                            other => {
                                return Err(value_error(format!(
                                    "bytes() expects ints in 0..=255, got {}",
                                    other.repr()
                                )))
                            }
                        }
                    }
                    Ok(Value::Bytes(out))
                }
            }
        }
        Builtin::Path => {
            arity(builtin, args, 1, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Path(s.clone())),
                Value::Path(p) => Ok(Value::Path(p.clone())),
                other => Err(type_error(format!(
                    "path() expects str, got {}",
                    other.type_name()
                ))),
            }
        }
        Builtin::Range => range(args),
        Builtin::Abs => {
            arity(builtin, args, 1, 1)?;
            match &args[0] {
                Value::Int(i) => Ok(match i.checked_abs() {
                    Some(v) => Value::Int(v),
                    None => normalize_big(-BigInt::from(*i)),
                }),
                Value::BigInt(b) => Ok(if b.sign() == num_bigint::Sign::Minus {
                    normalize_big(-b.clone())
                } else {
                    Value::BigInt(b.clone())
                }),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(type_error(format!(
                    "bad operand type for abs(): {}",
                    other.type_name()
                ))),
            }
        }
        Builtin::Type => {
            arity(builtin, args, 1, 1)?;
            Ok(Value::Str(args[0].type_name().to_string()))
        }
        Builtin::Gather => unreachable!("gather is dispatched by the call frame"),
    }
}

const RANGE_LIMIT: i64 = 10_000_000;

fn range(args: &[Value]) -> BuiltinResult {
    arity(Builtin::Range, args, 1, 3)?;
    let mut bounds = [0i64; 3];
    for (slot, arg) in bounds.iter_mut().zip(args) {
        match arg {
            Value::Int(i) => *slot = *i,
            other => {
                return Err(type_error(format!(
                    "range() expects int, got {}",
                    other.type_name()
                )))
            }
        }
    }
    let (start, stop, step) = match args.len() {
        1 => (0, bounds[0], 1),
        2 => (bounds[0], bounds[1], 1),
        _ => (bounds[0], bounds[1], bounds[2]),
    };
    if step == 0 {
        return Err(value_error("range() step must not be zero".into()));
    }
    let mut out = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        out.push(Value::Int(current));
        if out.len() as i64 > RANGE_LIMIT {
            return Err(value_error("range() result too large".into()));
        }
        current += step;
    }
    Ok(Value::List(out))
}

fn to_int(value: &Value) -> BuiltinResult {
    match value {
        Value::Int(_) | Value::BigInt(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(value_error(format!("cannot convert {f} to int")));
            }
            let truncated = f.trunc();
            match BigInt::from_f64(truncated) {
                Some(b) => Ok(normalize_big(b)),
                None => Err(value_error(format!("cannot convert {f} to int"))),
            }
        }
        Value::Str(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Ok(Value::Int(i))
            } else if let Ok(b) = trimmed.parse::<BigInt>() {
                Ok(normalize_big(b))
            } else {
                Err(value_error(format!(
                    "invalid literal for int(): {}",
                    Value::Str(s.clone()).repr()
                )))
            }
        }
        other => Err(type_error(format!(
            "int() argument must be a number or str, not {}",
            other.type_name()
        ))),
    }
}

fn to_float(value: &Value) -> BuiltinResult {
    match value {
        Value::Float(_) => Ok(value.clone()),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::BigInt(b) => match b.to_f64() {
            Some(f) => Ok(Value::Float(f)),
            None => Err(value_error("int too large for float()".into())),
        },
        Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| {
                value_error(format!(
                    "invalid literal for float(): {}",
                    Value::Str(s.clone()).repr()
                ))
            }),
        other => Err(type_error(format!(
            "float() argument must be a number or str, not {}",
            other.type_name()
        ))),
    }
}
