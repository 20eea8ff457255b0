use std::fmt;

use serde_json::Value as Json;

use crate::error::CoreError;
use crate::names::self_link_to_name;
use crate::schema::ResourceSchema;
use crate::validate::validate;
use crate::value::{Object, Value};
use crate::wire::{self, Decode};

/// A resource instance: a value tree tagged with the schema that shapes it.
///
/// Resources are built fresh for each apply and owned by the caller.
#[derive(Debug, Clone)]
pub struct Resource {
    schema: &'static ResourceSchema,
    fields: Object,
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.fields == other.fields
    }
}

impl Resource {
    pub fn new(schema: &'static ResourceSchema) -> Self {
        Self {
            schema,
            fields: Object::new(),
        }
    }

    pub fn from_fields(schema: &'static ResourceSchema, fields: Object) -> Self {
        Self { schema, fields }
    }

    /// Parse a caller-written manifest. Unknown keys are rejected; `{}`
    /// marks a nested object as explicitly empty.
    pub fn from_json(schema: &'static ResourceSchema, json: &Json) -> Result<Self, CoreError> {
        let fields = wire::decode_object(&schema.root, json, Decode::Strict, "")?;
        Ok(Self { schema, fields })
    }

    /// Flatten a server response body, filling declared defaults.
    pub fn from_response(
        schema: &'static ResourceSchema,
        json: &Json,
    ) -> Result<Self, CoreError> {
        let fields = wire::decode_object(&schema.root, json, Decode::Lenient, "")?;
        Ok(Self { schema, fields })
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    pub fn kind(&self) -> &'static str {
        self.schema.kind
    }

    pub fn fields(&self) -> &Object {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.fields.str(name).filter(|s| !s.is_empty())
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.set(name, value);
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.fields.set(name, value);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.str("name")
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate(&self.schema.root, &self.fields)
    }

    /// Request body for create: every body field.
    pub fn to_body(&self) -> serde_json::Map<String, Json> {
        wire::encode_object(&self.schema.root, &self.fields)
    }

    /// Full rendering including path parameters, for display.
    pub fn to_json(&self) -> Json {
        self.fields.to_json()
    }

    /// Short-name identity (`project/name`), or `None` while any identity
    /// field is unset.
    pub fn identity(&self) -> Option<String> {
        let parts = self
            .schema
            .identity
            .iter()
            .map(|f| self.str(f).map(self_link_to_name))
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("/"))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity() {
            Some(id) => write!(f, "{}({id})", self.schema.kind),
            None => write!(f, "{}(<unnamed>)", self.schema.kind),
        }
    }
}
