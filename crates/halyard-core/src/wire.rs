//! Conversion between JSON request/response bodies and the value tree.
//!
//! Decoding ("flattening") runs in two modes: [`Decode::Strict`] for
//! caller-written manifests, where unknown keys are mistakes, and
//! [`Decode::Lenient`] for server responses, which carry fields the schema
//! does not model and where declared defaults must be filled in.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};

use crate::error::CoreError;
use crate::schema::{Field, FieldKind, ObjectSchema};
use crate::value::{Nested, Object, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    Strict,
    Lenient,
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

/// Decode a JSON object into an [`Object`] shaped by `schema`.
pub fn decode_object(
    schema: &ObjectSchema,
    json: &Json,
    mode: Decode,
    path: &str,
) -> Result<Object, CoreError> {
    let map = json.as_object().ok_or_else(|| CoreError::TypeMismatch {
        path: if path.is_empty() {
            schema.name.to_string()
        } else {
            path.to_string()
        },
        expected: "an object",
    })?;

    if mode == Decode::Strict {
        if let Some(unknown) = map.keys().find(|k| schema.field(k).is_none()) {
            return Err(CoreError::UnknownField(join(path, unknown)));
        }
    }

    let mut obj = Object::new();
    for field in schema.fields {
        match map.get(field.name) {
            None | Some(Json::Null) => {}
            Some(raw) => {
                let value = decode_value(field, raw, mode, &join(path, field.name))?;
                obj.set(field.name, value);
            }
        }
    }

    if mode == Decode::Lenient {
        fill_defaults(schema, &mut obj);
    }
    Ok(obj)
}

fn decode_value(field: &Field, raw: &Json, mode: Decode, path: &str) -> Result<Value, CoreError> {
    let mismatch = || CoreError::TypeMismatch {
        path: path.to_string(),
        expected: field.kind.describe(),
    };

    let value = match field.kind {
        FieldKind::String | FieldKind::Reference | FieldKind::Enum(_) => {
            Value::String(raw.as_str().ok_or_else(mismatch)?.to_string())
        }
        FieldKind::Bool => Value::Bool(raw.as_bool().ok_or_else(mismatch)?),
        // int64 fields arrive as JSON strings from the API.
        FieldKind::Integer => match raw {
            Json::Number(n) => Value::Integer(n.as_i64().ok_or_else(mismatch)?),
            Json::String(s) => Value::Integer(s.parse().map_err(|_| mismatch())?),
            _ => return Err(mismatch()),
        },
        FieldKind::Double => Value::Double(raw.as_f64().ok_or_else(mismatch)?),
        FieldKind::StringList | FieldKind::StringSet => {
            let items = raw.as_array().ok_or_else(mismatch)?;
            let strings = items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(mismatch))
                .collect::<Result<Vec<_>, _>>()?;
            Value::StringArray(strings)
        }
        FieldKind::StringMap => {
            let entries = raw.as_object().ok_or_else(mismatch)?;
            let map = entries
                .iter()
                .map(|(k, v)| {
                    v.as_str()
                        .map(|s| (k.clone(), s.to_string()))
                        .ok_or_else(mismatch)
                })
                .collect::<Result<BTreeMap<_, _>, _>>()?;
            Value::StringMap(map)
        }
        FieldKind::Object(schema) => {
            let entries = raw.as_object().ok_or_else(mismatch)?;
            if entries.is_empty() {
                Value::Object(Nested::ExplicitEmpty)
            } else {
                Value::object(decode_object(schema, raw, mode, path)?)
            }
        }
        FieldKind::ObjectList(schema) | FieldKind::ObjectSet(schema) => {
            let items = raw.as_array().ok_or_else(mismatch)?;
            let objects = items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_object(schema, item, mode, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()?;
            Value::ObjectArray(objects)
        }
    };
    Ok(value)
}

/// Set declared defaults on absent or zero-valued scalars, recursing into
/// present nested objects and collections.
pub fn fill_defaults(schema: &ObjectSchema, obj: &mut Object) {
    for field in schema.fields {
        if let Some(default) = field.default {
            if obj.get(field.name).is_none_or(Value::is_empty) {
                obj.set(field.name, default.to_value());
            }
            continue;
        }
        match (field.kind, obj.get_mut(field.name)) {
            (FieldKind::Object(sub), Some(Value::Object(Nested::Present(inner)))) => {
                fill_defaults(sub, inner);
            }
            (
                FieldKind::ObjectList(sub) | FieldKind::ObjectSet(sub),
                Some(Value::ObjectArray(items)),
            ) => {
                for item in items {
                    fill_defaults(sub, item);
                }
            }
            _ => {}
        }
    }
}

/// Encode every body field of `obj`.
pub fn encode_object(schema: &ObjectSchema, obj: &Object) -> Map<String, Json> {
    encode_filtered(schema, obj, |_| true)
}

/// Encode the body fields of `obj` accepted by `keep`. Path parameters,
/// output-only fields and unset values are never sent.
pub fn encode_filtered(
    schema: &ObjectSchema,
    obj: &Object,
    keep: impl Fn(&Field) -> bool,
) -> Map<String, Json> {
    let mut out = Map::new();
    for field in schema.fields {
        if field.path_param || field.output_only || !keep(field) {
            continue;
        }
        let Some(value) = obj.get(field.name) else {
            continue;
        };
        if let Some(json) = encode_value(field, value) {
            out.insert(field.name.to_string(), json);
        }
    }
    out
}

fn encode_value(field: &Field, value: &Value) -> Option<Json> {
    match (field.kind, value) {
        (_, Value::String(s)) if s.is_empty() => None,
        (_, Value::StringArray(v)) if v.is_empty() => None,
        (_, Value::StringMap(m)) if m.is_empty() => None,
        (_, Value::ObjectArray(v)) if v.is_empty() => None,
        (FieldKind::Integer, Value::Integer(i)) => Some(Json::from(*i)),
        (FieldKind::Object(sub), Value::Object(nested)) if sub.is_marker() => {
            (!nested.is_absent()).then(|| Json::Object(Map::new()))
        }
        (FieldKind::Object(sub), Value::Object(Nested::Present(inner))) => {
            let map = encode_object(sub, inner);
            (!map.is_empty()).then_some(Json::Object(map))
        }
        (_, Value::Object(_)) => None,
        (
            FieldKind::ObjectList(sub) | FieldKind::ObjectSet(sub),
            Value::ObjectArray(items),
        ) => Some(Json::Array(
            items
                .iter()
                .map(|item| Json::Object(encode_object(sub, item)))
                .collect(),
        )),
        (_, other) => Some(other.to_json()),
    }
}
