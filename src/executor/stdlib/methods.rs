//! Value methods
//!
//! Method calls dispatch on the receiver's type. The set is deliberately
//! small; anything else raises AttributeError.

use crate::value::{ExcKind, ExceptionValue, Value};

type MethodResult = Result<Value, ExceptionValue>;

fn type_error(message: String) -> ExceptionValue {
    ExceptionValue::new(ExcKind::TypeError, message)
}

fn no_method(recv: &Value, name: &str) -> ExceptionValue {
    ExceptionValue::new(
        ExcKind::AttributeError,
        format!("{} object has no method {name:?}", recv.type_name()),
    )
}

fn check_arity(
    recv: &Value,
    name: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> Result<(), ExceptionValue> {
    if args.len() < min || args.len() > max {
        return Err(type_error(format!(
            "{}.{name}() takes {} arguments, got {}",
            recv.type_name(),
            if min == max { format!("{min}") } else { format!("{min} to {max}") },
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn call_method(recv: &Value, name: &str, args: &[Value]) -> MethodResult {
    match recv {
        Value::Str(s) => str_method(recv, s, name, args),
        Value::Dict(pairs) => dict_method(recv, pairs, name, args),
        _ => Err(no_method(recv, name)),
    }
}

fn str_method(recv: &Value, s: &str, name: &str, args: &[Value]) -> MethodResult {
    match name {
        "upper" => {
            check_arity(recv, name, args, 0, 0)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        "lower" => {
            check_arity(recv, name, args, 0, 0)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        "strip" => {
            check_arity(recv, name, args, 0, 0)?;
            Ok(Value::Str(s.trim().to_string()))
        }
        "split" => {
            check_arity(recv, name, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None => s
                    .split_whitespace()
                    .map(|part| Value::Str(part.to_string()))
                    .collect(),
                Some(Value::Str(sep)) if !sep.is_empty() => s
                    .split(sep.as_str())
                    .map(|part| Value::Str(part.to_string()))
                    .collect(),
                Some(Value::Str(_)) => {
                    return Err(ExceptionValue::new(ExcKind::ValueError, "empty separator"))
                }
                Some(other) => {
                    return Err(type_error(format!(
                        "str.split() separator must be str, not {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::List(parts))
        }
        "join" => {
            check_arity(recv, name, args, 1, 1)?;
            let items = match &args[0] {
                Value::List(items) | Value::Tuple(items) => items,
                other => {
                    return Err(type_error(format!(
                        "str.join() expects a sequence, got {}",
                        other.type_name()
                    )))
                }
            };
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(part) => parts.push(part.clone()),
                    other => {
                        return Err(type_error(format!(
                            "str.join() expects str items, got {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::Str(parts.join(s)))
        }
        "starts_with" => {
            check_arity(recv, name, args, 1, 1)?;
            match &args[0] {
                Value::Str(prefix) => Ok(Value::Bool(s.starts_with(prefix.as_str()))),
                other => Err(type_error(format!(
                    "str.starts_with() expects str, got {}",
                    other.type_name()
                ))),
            }
        }
        "ends_with" => {
            check_arity(recv, name, args, 1, 1)?;
            match &args[0] {
                Value::Str(suffix) => Ok(Value::Bool(s.ends_with(suffix.as_str()))),
                other => Err(type_error(format!(
                    "str.ends_with() expects str, got {}",
                    other.type_name()
                ))),
            }
        }
        _ => Err(no_method(recv, name)),
    }
}

fn dict_method(
    recv: &Value,
    pairs: &[(Value, Value)],
    name: &str,
    args: &[Value],
) -> MethodResult {
    match name {
        "get" => {
            check_arity(recv, name, args, 1, 2)?;
            let found = pairs.iter().find(|(k, _)| k.eq_value(&args[0]));
            Ok(match found {
                Some((_, v)) => v.clone(),
                None => args.get(1).cloned().unwrap_or(Value::Null),
            })
        }
        "keys" => {
            check_arity(recv, name, args, 0, 0)?;
            Ok(Value::List(pairs.iter().map(|(k, _)| k.clone()).collect()))
        }
        "values" => {
            check_arity(recv, name, args, 0, 0)?;
            Ok(Value::List(pairs.iter().map(|(_, v)| v.clone()).collect()))
        }
        "items" => {
            check_arity(recv, name, args, 0, 0)?;
            Ok(Value::List(
                pairs
                    .iter()
                    .map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()]))
                    .collect(),
            ))
        }
        _ => Err(no_method(recv, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn str_methods() {
        let s = Value::Str("  Hello World  ".into());
        assert_eq!(
            call_method(&s, "strip", &[]).unwrap(),
            Value::Str("Hello World".into())
        );
        assert_eq!(
            call_method(&Value::Str("a,b".into()), "split", &[Value::Str(",".into())]).unwrap(),
            Value::List(vec![Value::Str("a".into()), Value::Str("b".into())])
        );
        assert_eq!(
            call_method(
                &Value::Str("-".into()),
                "join",
                &[Value::List(vec![
                    Value::Str("a".into()),
                    Value::Str("b".into())
                ])]
            )
            .unwrap(),
            Value::Str("a-b".into())
        );
    }

    #[test]
    fn dict_get_with_default() {
        let d = Value::Dict(vec![(Value::Str("a".into()), Value::Int(1))]);
        assert_eq!(
            call_method(&d, "get", &[Value::Str("a".into())]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            call_method(&d, "get", &[Value::Str("b".into()), Value::Int(9)]).unwrap(),
            Value::Int(9)
        );
        assert_eq!(
            call_method(&d, "get", &[Value::Str("b".into())]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn unknown_method_is_attribute_error() {
        let err = call_method(&Value::Int(1), "upper", &[]).unwrap_err();
        assert_eq!(err.kind, crate::value::ExcKind::AttributeError);
    }
}
