//! Conversion between plain JSON and Firestore's typed value encoding
//!
//! Firestore's REST API wraps every value in a single-key object naming its
//! type (`{"stringValue": "a"}`, `{"integerValue": "3"}`, ...). Integers
//! travel as strings. RFC 3339 strings are written as `timestampValue` so
//! they order together with timestamps written by other clients; on the way
//! back timestamps decode to RFC 3339 strings.

use crate::error::{Error, Result};
use chrono::DateTime;
use serde_json::{json, Map, Value};

/// Encode one JSON value as a Firestore value
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) if looks_like_timestamp(s) => json!({ "timestampValue": s }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_map(map) } }),
    }
}

/// Encode a JSON object as a Firestore `fields` map
pub fn encode_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), encode(v))).collect()
}

/// Encode a document body (`{"fields": {...}}`); the root must be an object
pub fn encode_document(data: &Value) -> Result<Value> {
    match data {
        Value::Object(map) => Ok(json!({ "fields": encode_map(map) })),
        _ => Err(Error::Store("documents must be JSON objects".to_string())),
    }
}

/// Decode one Firestore value into plain JSON
pub fn decode(value: &Value) -> Result<Value> {
    let obj = value
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| Error::Malformed(format!("not a Firestore value: {}", value)))?;
    // len() == 1 checked above
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| Error::Malformed("empty Firestore value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| malformed(kind, inner)),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed.map(Value::from).ok_or_else(|| malformed(kind, inner))
        }
        "doubleValue" => match inner {
            Value::Number(_) => Ok(inner.clone()),
            // NaN and the infinities arrive as strings and have no JSON form
            Value::String(_) => Ok(Value::Null),
            _ => Err(malformed(kind, inner)),
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| malformed(kind, inner)),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values,
                None => return Ok(Value::Array(Vec::new())),
                Some(other) => return Err(malformed(kind, other)),
            };
            values.iter().map(decode).collect::<Result<Vec<_>>>().map(Value::Array)
        }
        "mapValue" => match inner.get("fields") {
            Some(fields) => decode_fields(fields),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(Error::Malformed(format!("unknown Firestore value type: {}", other))),
    }
}

/// Decode a Firestore `fields` map into a JSON object
pub fn decode_fields(fields: &Value) -> Result<Value> {
    let map = fields
        .as_object()
        .ok_or_else(|| Error::Malformed("fields is not an object".to_string()))?;
    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        out.insert(key.clone(), decode(value)?);
    }
    Ok(Value::Object(out))
}

/// Decode a Firestore document resource into `(id, data)`
pub fn decode_document(doc: &Value) -> Result<(String, Value)> {
    let name = doc
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Malformed("document without name".to_string()))?;
    let id = name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Malformed(format!("bad document name: {}", name)))?
        .to_string();
    let data = match doc.get("fields") {
        Some(fields) => decode_fields(fields)?,
        None => Value::Object(Map::new()),
    };
    Ok((id, data))
}

fn looks_like_timestamp(s: &str) -> bool {
    s.len() >= 20 && s.as_bytes().get(10) == Some(&b'T') && DateTime::parse_from_rfc3339(s).is_ok()
}

fn malformed(kind: &str, inner: &Value) -> Error {
    Error::Malformed(format!("invalid {}: {}", kind, inner))
}
