//! Runtime value types
//!
//! `Value` is the closed data model for everything that crosses the
//! execution boundary: program inputs, boundary-call arguments, results,
//! and the contents of suspended state. Exceptions are ordinary values
//! (a program that raises finishes with an exception result, it does not
//! fail the engine call).

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

/* ===================== Call Ids ===================== */

/// Identifier for one outstanding boundary call within an execution.
///
/// Assigned monotonically by the vm. Future values reference the call
/// they were created from, which is why this lives with the value model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct CallId(pub u32);

impl CallId {
    /// The underlying integer id.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/* ===================== Exceptions ===================== */

/// Exception kinds understood by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExcKind {
    TypeError,
    ValueError,
    NameError,
    IndexError,
    KeyError,
    ZeroDivisionError,
    AttributeError,
    RuntimeError,
    RecursionError,
    OsError,
    CancelledError,
}

impl ExcKind {
    pub fn name(self) -> &'static str {
        match self {
            ExcKind::TypeError => "TypeError",
            ExcKind::ValueError => "ValueError",
            ExcKind::NameError => "NameError",
            ExcKind::IndexError => "IndexError",
            ExcKind::KeyError => "KeyError",
            ExcKind::ZeroDivisionError => "ZeroDivisionError",
            ExcKind::AttributeError => "AttributeError",
            ExcKind::RuntimeError => "RuntimeError",
            ExcKind::RecursionError => "RecursionError",
            ExcKind::OsError => "OsError",
            ExcKind::CancelledError => "CancelledError",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "TypeError" => ExcKind::TypeError,
            "ValueError" => ExcKind::ValueError,
            "NameError" => ExcKind::NameError,
            "IndexError" => ExcKind::IndexError,
            "KeyError" => ExcKind::KeyError,
            "ZeroDivisionError" => ExcKind::ZeroDivisionError,
            "AttributeError" => ExcKind::AttributeError,
            "RuntimeError" => ExcKind::RuntimeError,
            "RecursionError" => ExcKind::RecursionError,
            "OsError" => ExcKind::OsError,
            "CancelledError" => ExcKind::CancelledError,
            _ => return None,
        })
    }
}

impl fmt::Display for ExcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One frame of an exception stack trace, outermost first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Enclosing function name, `<module>` for top-level code.
    pub function: String,
    /// Source line of the active statement or call.
    pub line: u32,
}

/// An exception as a first-class runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionValue {
    pub kind: ExcKind,
    pub message: String,
    /// Call chain at the raise site. Empty until the exception is raised.
    pub trace: Vec<TraceFrame>,
}

impl ExceptionValue {
    pub fn new(kind: ExcKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: Vec::new(),
        }
    }

    /// `Kind: message` one-liner used in error reporting.
    pub fn summary(&self) -> String {
        if self.message.is_empty() {
            self.kind.name().to_string()
        } else {
            format!("{}: {}", self.kind, self.message)
        }
    }
}

impl fmt::Display for ExceptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/* ===================== Values ===================== */

/// Runtime value.
///
/// Fixed-width integers promote to `BigInt` on overflow instead of
/// wrapping; the two variants are one logical integer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion-ordered, deduplicated under language equality.
    Set(Vec<Value>),
    /// Insertion-ordered key/value pairs, looked up under language equality.
    Dict(Vec<(Value, Value)>),
    Exception(Box<ExceptionValue>),
    Path(String),
    /// Named structured record with ordered fields.
    Record {
        name: String,
        fields: Vec<(String, Value)>,
    },
    /// Display-only marker for values that can be shown but not
    /// round-tripped. Rejected as a program input.
    Repr(String),
    /// Result of an external call the host resolved as pending. Internal
    /// to a running execution; never produced by the boundary codec.
    Future(CallId),
}

impl Value {
    /// Truthiness for conditionals: null, false, numeric zero and empty
    /// strings/containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::BigInt(b) => !b.is_zero(),
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(v) | Value::Tuple(v) | Value::Set(v) => !v.is_empty(),
            Value::Dict(pairs) => !pairs.is_empty(),
            _ => true,
        }
    }

    /// Language-level type name, as reported by `type()` and in errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::BigInt(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Exception(_) => "exception",
            Value::Path(_) => "path",
            Value::Record { .. } => "record",
            Value::Repr(_) => "repr",
            Value::Future(_) => "future",
        }
    }

    /// Language equality. Numeric variants compare across
    /// `Int`/`BigInt`/`Float`; sets and dicts compare order-insensitively;
    /// everything else is structural.
    pub fn eq_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(a), Value::BigInt(b)) | (Value::BigInt(b), Value::Int(a)) => {
                BigInt::from(*a) == *b
            }
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::BigInt(a), Value::Float(b)) | (Value::Float(b), Value::BigInt(a)) => {
                a.to_f64().map_or(false, |a| a == *b)
            }
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::Repr(a), Value::Repr(b)) => a == b,
            (Value::Future(a), Value::Future(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_value(y))
            }
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.eq_value(y)))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(bk, bv)| k.eq_value(bk) && v.eq_value(bv))
                    })
            }
            (Value::Exception(a), Value::Exception(b)) => a == b,
            (
                Value::Record { name: an, fields: af },
                Value::Record { name: bn, fields: bf },
            ) => {
                an == bn
                    && af.len() == bf.len()
                    && af
                        .iter()
                        .zip(bf)
                        .all(|((ak, av), (bk, bv))| ak == bk && av.eq_value(bv))
            }
            _ => false,
        }
    }

    /// Language ordering for `<`/`<=`/`>`/`>=`. Numbers compare across
    /// variants; strings, bytes and sequences compare lexicographically;
    /// anything else is unordered.
    pub fn cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::BigInt(b)) => Some(BigInt::from(*a).cmp(b)),
            (Value::BigInt(a), Value::Int(b)) => Some(a.cmp(&BigInt::from(*b))),
            (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::BigInt(a), Value::Float(b)) => a.to_f64()?.partial_cmp(b),
            (Value::Float(a), Value::BigInt(b)) => a.partial_cmp(&b.to_f64()?),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.cmp_value(y)? {
                        Ordering::Equal => continue,
                        other => return Some(other),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Source-shaped rendering, as produced by `repr()`.
    pub fn repr(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
            Value::Int(i) => i.to_string(),
            Value::BigInt(b) => b.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => format!("\"{}\"", escape_str(s)),
            Value::Bytes(b) => format!("b\"{}\"", escape_bytes(b)),
            Value::List(items) => format!("[{}]", join_reprs(items)),
            Value::Tuple(items) => match items.len() {
                1 => format!("({},)", items[0].repr()),
                _ => format!("({})", join_reprs(items)),
            },
            Value::Set(items) => {
                if items.is_empty() {
                    "set()".to_string()
                } else {
                    format!("{{{}}}", join_reprs(items))
                }
            }
            Value::Dict(pairs) => {
                let body: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", body.join(", "))
            }
            Value::Exception(exc) => {
                format!("{}(\"{}\")", exc.kind, escape_str(&exc.message))
            }
            Value::Path(p) => format!("path(\"{}\")", escape_str(p)),
            Value::Record { name, fields } => {
                let body: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v.repr()))
                    .collect();
                format!("{}({})", name, body.join(", "))
            }
            Value::Repr(r) => r.clone(),
            Value::Future(id) => format!("<future {id}>"),
        }
    }

    /// `str()` semantics: strings and paths render bare, everything else
    /// as its repr.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Path(p) => p.clone(),
            Value::Exception(exc) => exc.summary(),
            other => other.repr(),
        }
    }

    /// True if the value (recursively) contains anything that cannot be
    /// handed to a fresh execution: display-only reprs or futures.
    pub fn contains_opaque(&self) -> bool {
        match self {
            Value::Repr(_) | Value::Future(_) => true,
            Value::List(v) | Value::Tuple(v) | Value::Set(v) => {
                v.iter().any(Value::contains_opaque)
            }
            Value::Dict(pairs) => pairs
                .iter()
                .any(|(k, v)| k.contains_opaque() || v.contains_opaque()),
            Value::Record { fields, .. } => fields.iter().any(|(_, v)| v.contains_opaque()),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

/// Collapse a big integer back to `Int` when it fits. Keeps the numeric
/// tower canonical: a `BigInt` in live state is always out of i64 range.
pub(crate) fn normalize_big(b: BigInt) -> Value {
    match b.to_i64() {
        Some(i) => Value::Int(i),
        None => Value::BigInt(b),
    }
}

fn join_reprs(items: &[Value]) -> String {
    let parts: Vec<String> = items.iter().map(Value::repr).collect();
    parts.join(", ")
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if f == f.trunc() && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(b as char),
            other => out.push_str(&format!("\\x{other:02x}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Dict(vec![]).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
        assert!(Value::Exception(Box::new(ExceptionValue::new(ExcKind::TypeError, ""))).is_truthy());
    }

    #[test]
    fn numeric_equality_crosses_variants() {
        assert!(Value::Int(1).eq_value(&Value::Float(1.0)));
        assert!(Value::Int(7).eq_value(&Value::BigInt(BigInt::from(7))));
        assert!(!Value::Int(1).eq_value(&Value::Str("1".into())));
    }

    #[test]
    fn set_equality_ignores_order() {
        let a = Value::Set(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Set(vec![Value::Int(2), Value::Int(1)]);
        assert!(a.eq_value(&b));
    }

    #[test]
    fn dict_equality_ignores_order() {
        let a = Value::Dict(vec![
            (Value::Str("a".into()), Value::Int(1)),
            (Value::Str("b".into()), Value::Int(2)),
        ]);
        let b = Value::Dict(vec![
            (Value::Str("b".into()), Value::Int(2)),
            (Value::Str("a".into()), Value::Int(1)),
        ]);
        assert!(a.eq_value(&b));
    }

    #[test]
    fn sequence_ordering_is_lexicographic() {
        let a = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::List(vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(a.cmp_value(&b), Some(Ordering::Less));
        let shorter = Value::List(vec![Value::Int(1)]);
        assert_eq!(shorter.cmp_value(&a), Some(Ordering::Less));
    }

    #[test]
    fn repr_shapes() {
        assert_eq!(Value::Float(2.0).repr(), "2.0");
        assert_eq!(Value::Str("a\"b".into()).repr(), "\"a\\\"b\"");
        assert_eq!(
            Value::Tuple(vec![Value::Int(1)]).repr(),
            "(1,)"
        );
        assert_eq!(Value::Set(vec![]).repr(), "set()");
        assert_eq!(
            Value::Dict(vec![(Value::Str("k".into()), Value::Null)]).repr(),
            "{\"k\": null}"
        );
    }

    #[test]
    fn normalize_big_collapses_small_values() {
        assert_eq!(normalize_big(BigInt::from(42)), Value::Int(42));
        let huge = BigInt::from(i64::MAX) + 1i32;
        assert_eq!(normalize_big(huge.clone()), Value::BigInt(huge));
    }

    #[test]
    fn opaque_detection_recurses() {
        let nested = Value::List(vec![Value::Dict(vec![(
            Value::Str("k".into()),
            Value::Repr("<socket>".into()),
        )])]);
        assert!(nested.contains_opaque());
        assert!(!Value::List(vec![Value::Int(1)]).contains_opaque());
    }
}
