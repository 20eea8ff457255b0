use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// A single field value inside a resource tree.
///
/// Enum and reference fields are carried as [`Value::String`]; the schema
/// decides how they are compared.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    Integer(i64),
    Double(f64),
    StringArray(Vec<String>),
    StringMap(BTreeMap<String, String>),
    Object(Nested),
    ObjectArray(Vec<Object>),
}

/// Presence of a nested object.
///
/// The remote API distinguishes "field omitted" from "field present but
/// empty" inside exactly-one-of groups, so a nested object has three states
/// instead of two.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Nested {
    #[default]
    Absent,
    ExplicitEmpty,
    Present(Object),
}

static ABSENT: Nested = Nested::Absent;

impl Nested {
    pub fn is_absent(&self) -> bool {
        matches!(self, Nested::Absent)
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Nested::Present(obj) => Some(obj),
            _ => None,
        }
    }

    /// True when absent, explicitly empty, or present with nothing set.
    pub fn is_empty(&self) -> bool {
        match self {
            Nested::Absent | Nested::ExplicitEmpty => true,
            Nested::Present(obj) => obj.is_empty(),
        }
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::StringArray(items.into_iter().map(Into::into).collect())
    }

    pub fn object(obj: Object) -> Self {
        Value::Object(Nested::Present(obj))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Zero-valued in the wire sense: `""`, `false`, `0`, empty collections,
    /// and nested objects with nothing set.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::Bool(b) => !b,
            Value::Integer(i) => *i == 0,
            Value::Double(d) => *d == 0.0,
            Value::StringArray(v) => v.is_empty(),
            Value::StringMap(m) => m.is_empty(),
            Value::Object(n) => n.is_empty(),
            Value::ObjectArray(v) => v.is_empty(),
        }
    }

    /// Schema-less JSON rendering, used for display and diff reporting.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::String(s) => Json::String(s.clone()),
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Double(d) => Json::from(*d),
            Value::StringArray(v) => Json::from(v.clone()),
            Value::StringMap(m) => Json::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), Json::String(v.clone())))
                    .collect(),
            ),
            Value::Object(Nested::Absent) => Json::Null,
            Value::Object(Nested::ExplicitEmpty) => Json::Object(serde_json::Map::new()),
            Value::Object(Nested::Present(obj)) => obj.to_json(),
            Value::ObjectArray(v) => Json::Array(v.iter().map(Object::to_json).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A set of named field values. Unset fields are simply missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Nested object state for `name`. Missing fields read as [`Nested::Absent`].
    pub fn nested(&self, name: &str) -> &Nested {
        match self.fields.get(name) {
            Some(Value::Object(n)) => n,
            _ => &ABSENT,
        }
    }

    /// Set a field. Setting [`Nested::Absent`] removes it.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if matches!(value, Value::Object(Nested::Absent)) {
            self.fields.remove(&name);
        } else {
            self.fields.insert(name, value);
        }
    }

    /// Set `name` only when `value` is `Some`, removing it otherwise.
    pub fn set_opt(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(v) => self.set(name, v),
            None => {
                self.fields.remove(name);
            }
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when no field carries a non-empty value.
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(Value::is_empty)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_absent_removes_field() {
        let mut obj = Object::new().with("httpCheck", Value::object(Object::new()));
        assert!(obj.contains("httpCheck"));
        obj.set("httpCheck", Value::Object(Nested::Absent));
        assert!(!obj.contains("httpCheck"));
        assert!(obj.nested("httpCheck").is_absent());
    }

    #[test]
    fn emptiness_follows_wire_zero_values() {
        assert!(Value::Bool(false).is_empty());
        assert!(Value::string("").is_empty());
        assert!(!Value::string("60s").is_empty());
        assert!(Value::Object(Nested::ExplicitEmpty).is_empty());

        let inner = Object::new().with("useSsl", Value::Bool(false));
        assert!(Value::object(inner).is_empty());
    }

    #[test]
    fn explicit_empty_renders_as_empty_object() {
        let obj = Object::new().with("tcpCheck", Value::Object(Nested::ExplicitEmpty));
        assert_eq!(obj.to_json(), serde_json::json!({ "tcpCheck": {} }));
    }
}
