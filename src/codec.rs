//! Boundary value codec
//!
//! Values cross the host boundary as self-describing tagged JSON. Plain
//! scalars and arrays map directly; everything else uses a single-key
//! `$tag` object. Encoding is total: internal values with no stable wire
//! form (futures, anything display-only) encode as `$repr`, which decodes
//! to the display-only [`Value::Repr`] marker and is rejected as a
//! program input.

use num_bigint::BigInt;
use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;

use crate::value::{ExcKind, ExceptionValue, TraceFrame, Value};

const TUPLE_TAG: &str = "$tuple";
const BYTES_TAG: &str = "$bytes";
const SET_TAG: &str = "$set";
const DICT_TAG: &str = "$dict";
const BIGINT_TAG: &str = "$bigint";
const PATH_TAG: &str = "$path";
const RECORD_TAG: &str = "$record";
const EXCEPTION_TAG: &str = "$exception";
const REPR_TAG: &str = "$repr";

/// A JSON document did not describe a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

fn bad(message: impl Into<String>) -> DecodeError {
    DecodeError(message.into())
}

/* ===================== Encoding ===================== */

/// Encode a value into its tagged JSON form.
pub fn encode_value(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => json!(i),
        Value::BigInt(b) => tagged(BIGINT_TAG, JsonValue::String(b.to_string())),
        Value::Float(f) => {
            if f.is_finite() {
                json!(f)
            } else {
                // JSON has no nan/inf; fall back to display-only.
                tagged(REPR_TAG, JsonValue::String(value.repr()))
            }
        }
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::Bytes(bytes) => tagged(
            BYTES_TAG,
            JsonValue::Array(bytes.iter().map(|b| json!(b)).collect()),
        ),
        Value::List(items) => JsonValue::Array(items.iter().map(encode_value).collect()),
        Value::Tuple(items) => tagged(
            TUPLE_TAG,
            JsonValue::Array(items.iter().map(encode_value).collect()),
        ),
        Value::Set(items) => tagged(
            SET_TAG,
            JsonValue::Array(items.iter().map(encode_value).collect()),
        ),
        Value::Dict(pairs) => tagged(
            DICT_TAG,
            JsonValue::Array(
                pairs
                    .iter()
                    .map(|(k, v)| JsonValue::Array(vec![encode_value(k), encode_value(v)]))
                    .collect(),
            ),
        ),
        Value::Exception(exc) => {
            let mut inner = Map::new();
            inner.insert("type".into(), JsonValue::String(exc.kind.to_string()));
            inner.insert("message".into(), JsonValue::String(exc.message.clone()));
            inner.insert(
                "trace".into(),
                JsonValue::Array(
                    exc.trace
                        .iter()
                        .map(|frame| {
                            json!({
                                "function": frame.function,
                                "line": frame.line,
                            })
                        })
                        .collect(),
                ),
            );
            tagged(EXCEPTION_TAG, JsonValue::Object(inner))
        }
        Value::Path(p) => tagged(PATH_TAG, JsonValue::String(p.clone())),
        Value::Record { name, fields } => {
            let mut inner = Map::new();
            inner.insert("name".into(), JsonValue::String(name.clone()));
            inner.insert(
                "fields".into(),
                JsonValue::Array(
                    fields
                        .iter()
                        .map(|(k, v)| {
                            JsonValue::Array(vec![JsonValue::String(k.clone()), encode_value(v)])
                        })
                        .collect(),
                ),
            );
            tagged(RECORD_TAG, JsonValue::Object(inner))
        }
        Value::Repr(r) => tagged(REPR_TAG, JsonValue::String(r.clone())),
        Value::Future(_) => tagged(REPR_TAG, JsonValue::String(value.repr())),
    }
}

/// Encode a value as a JSON string.
pub fn value_to_string(value: &Value) -> String {
    encode_value(value).to_string()
}

/* ===================== Decoding ===================== */

/// Decode tagged JSON back into a value.
pub fn decode_value(json: JsonValue) -> Result<Value, DecodeError> {
    match json {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Bool(b)),
        JsonValue::Number(num) => {
            if let Some(i) = num.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(u) = num.as_u64() {
                Ok(Value::BigInt(BigInt::from(u)))
            } else if let Some(f) = num.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(bad("invalid JSON number"))
            }
        }
        JsonValue::String(s) => Ok(Value::Str(s)),
        JsonValue::Array(items) => Ok(Value::List(decode_items(items)?)),
        JsonValue::Object(map) => decode_object(map),
    }
}

/// Decode a value from a JSON string.
pub fn value_from_str(json: &str) -> Result<Value, DecodeError> {
    let parsed: JsonValue =
        serde_json::from_str(json).map_err(|err| bad(err.to_string()))?;
    decode_value(parsed)
}

fn decode_object(mut map: Map<String, JsonValue>) -> Result<Value, DecodeError> {
    if let Some(items) = map.remove(TUPLE_TAG) {
        return Ok(Value::Tuple(decode_items(expect_array(items, TUPLE_TAG)?)?));
    }
    if let Some(items) = map.remove(SET_TAG) {
        let mut out: Vec<Value> = Vec::new();
        for item in decode_items(expect_array(items, SET_TAG)?)? {
            if !out.iter().any(|existing| existing.eq_value(&item)) {
                out.push(item);
            }
        }
        return Ok(Value::Set(out));
    }
    if let Some(items) = map.remove(BYTES_TAG) {
        let mut bytes = Vec::new();
        for item in expect_array(items, BYTES_TAG)? {
            let byte = item
                .as_u64()
                .filter(|b| *b <= u8::MAX as u64)
                .ok_or_else(|| bad("$bytes expects integers in 0..=255"))?;
            bytes.push(byte as u8);
        }
        return Ok(Value::Bytes(bytes));
    }
    if let Some(entries) = map.remove(DICT_TAG) {
        let mut pairs = Vec::new();
        for entry in expect_array(entries, DICT_TAG)? {
            match entry {
                JsonValue::Array(mut kv) if kv.len() == 2 => {
                    let value = decode_value(kv.pop().ok_or_else(|| bad("empty $dict entry"))?)?;
                    let key = decode_value(kv.pop().ok_or_else(|| bad("empty $dict entry"))?)?;
                    pairs.push((key, value));
                }
                _ => return Err(bad("$dict entries must be [key, value] pairs")),
            }
        }
        return Ok(Value::Dict(pairs));
    }
    if let Some(token) = map.remove(BIGINT_TAG) {
        let raw = token
            .as_str()
            .ok_or_else(|| bad("$bigint must be a string"))?;
        let parsed = raw
            .parse::<BigInt>()
            .map_err(|err| bad(format!("invalid bigint literal: {err}")))?;
        return Ok(Value::BigInt(parsed));
    }
    if let Some(path) = map.remove(PATH_TAG) {
        let raw = path.as_str().ok_or_else(|| bad("$path must be a string"))?;
        return Ok(Value::Path(raw.to_owned()));
    }
    if let Some(repr) = map.remove(REPR_TAG) {
        let raw = repr.as_str().ok_or_else(|| bad("$repr must be a string"))?;
        return Ok(Value::Repr(raw.to_owned()));
    }
    if let Some(raw) = map.remove(EXCEPTION_TAG) {
        return decode_exception(raw);
    }
    if let Some(raw) = map.remove(RECORD_TAG) {
        return decode_record(raw);
    }

    // No tag: a plain JSON object is a dict with string keys.
    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        pairs.push((Value::Str(key), decode_value(value)?));
    }
    Ok(Value::Dict(pairs))
}

fn decode_exception(raw: JsonValue) -> Result<Value, DecodeError> {
    let mut map = match raw {
        JsonValue::Object(m) => m,
        _ => return Err(bad("$exception must be an object")),
    };
    let kind_name = map
        .remove("type")
        .and_then(|v| v.as_str().map(str::to_owned))
        .ok_or_else(|| bad("$exception.type missing"))?;
    let kind = ExcKind::from_name(&kind_name)
        .ok_or_else(|| bad(format!("unknown exception type {kind_name:?}")))?;
    let message = map
        .remove("message")
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default();
    let mut trace = Vec::new();
    if let Some(JsonValue::Array(frames)) = map.remove("trace") {
        for frame in frames {
            let function = frame
                .get("function")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| bad("$exception trace frame missing function"))?
                .to_owned();
            let line = frame
                .get("line")
                .and_then(JsonValue::as_u64)
                .ok_or_else(|| bad("$exception trace frame missing line"))?;
            trace.push(TraceFrame {
                function,
                line: line as u32,
            });
        }
    }
    Ok(Value::Exception(Box::new(ExceptionValue {
        kind,
        message,
        trace,
    })))
}

fn decode_record(raw: JsonValue) -> Result<Value, DecodeError> {
    let map = match raw {
        JsonValue::Object(m) => m,
        _ => return Err(bad("$record must be an object")),
    };
    let name = map
        .get("name")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| bad("$record.name missing"))?
        .to_owned();
    let raw_fields = map
        .get("fields")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| bad("$record.fields missing"))?;
    let mut fields = Vec::with_capacity(raw_fields.len());
    for entry in raw_fields {
        match entry {
            JsonValue::Array(kv) if kv.len() == 2 => {
                let key = kv[0]
                    .as_str()
                    .ok_or_else(|| bad("$record field names must be strings"))?
                    .to_owned();
                fields.push((key, decode_value(kv[1].clone())?));
            }
            _ => return Err(bad("$record fields must be [name, value] pairs")),
        }
    }
    Ok(Value::Record { name, fields })
}

fn decode_items(items: Vec<JsonValue>) -> Result<Vec<Value>, DecodeError> {
    items.into_iter().map(decode_value).collect()
}

fn expect_array(value: JsonValue, tag: &str) -> Result<Vec<JsonValue>, DecodeError> {
    match value {
        JsonValue::Array(items) => Ok(items),
        _ => Err(bad(format!("{tag} must be an array"))),
    }
}

fn tagged(tag: &str, inner: JsonValue) -> JsonValue {
    let mut outer = Map::new();
    outer.insert(tag.to_owned(), inner);
    JsonValue::Object(outer)
}
