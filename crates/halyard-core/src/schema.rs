//! Static description of resource shapes and their diff policy.
//!
//! Every resource type is a tree of [`ObjectSchema`]s. Canonicalization,
//! diffing, validation and wire conversion are all driven from these tables,
//! so adding a resource type means declaring data, not writing code.

use crate::value::{Nested, Value};

/// What reconciling a changed field requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Field is immutable; any change needs delete + create.
    Recreate,
    /// Field is covered by the named partial-update calls.
    Triggers(&'static [&'static str]),
    /// Differences are never reported.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    String,
    /// Cross-resource identifier. Compared by short name, always recreates.
    Reference,
    Bool,
    Integer,
    Double,
    Enum(&'static [&'static str]),
    /// Order-sensitive string array.
    StringList,
    /// String array compared as a multiset.
    StringSet,
    StringMap,
    Object(&'static ObjectSchema),
    /// Object collection matched by index.
    ObjectList(&'static ObjectSchema),
    /// Object collection matched by structural equality.
    ObjectSet(&'static ObjectSchema),
}

impl FieldKind {
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            FieldKind::Object(_) | FieldKind::ObjectList(_) | FieldKind::ObjectSet(_)
        )
    }

    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Reference | FieldKind::Enum(_) => "a string",
            FieldKind::Bool => "a boolean",
            FieldKind::Integer => "an integer",
            FieldKind::Double => "a number",
            FieldKind::StringList | FieldKind::StringSet => "an array of strings",
            FieldKind::StringMap => "an object of strings",
            FieldKind::Object(_) => "an object",
            FieldKind::ObjectList(_) | FieldKind::ObjectSet(_) => "an array of objects",
        }
    }
}

/// Server-side default for a scalar field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Str(&'static str),
    Bool(bool),
    Integer(i64),
}

impl Literal {
    pub fn to_value(self) -> Value {
        match self {
            Literal::Str(s) => Value::String(s.to_string()),
            Literal::Bool(b) => Value::Bool(b),
            Literal::Integer(i) => Value::Integer(i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    /// Wire name, also used in diff paths and update masks.
    pub name: &'static str,
    pub kind: FieldKind,
    pub operation: Operation,
    pub required: bool,
    /// The server fills this in when omitted, so an absent desired value
    /// never produces a diff.
    pub server_default: bool,
    pub default: Option<Literal>,
    /// Set by the server only; never sent, never diffed.
    pub output_only: bool,
    /// Sent but never echoed back (secrets, masked headers).
    pub input_only: bool,
    /// Part of the URL, not of the request body.
    pub path_param: bool,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            operation: Operation::Ignore,
            required: false,
            server_default: false,
            default: None,
            output_only: false,
            input_only: false,
            path_param: false,
        }
    }

    pub const fn recreate(mut self) -> Self {
        self.operation = Operation::Recreate;
        self
    }

    pub const fn triggers(mut self, operations: &'static [&'static str]) -> Self {
        self.operation = Operation::Triggers(operations);
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn server_default(mut self) -> Self {
        self.server_default = true;
        self
    }

    pub const fn default_to(mut self, literal: Literal) -> Self {
        self.default = Some(literal);
        self.server_default = true;
        self
    }

    pub const fn output_only(mut self) -> Self {
        self.output_only = true;
        self
    }

    pub const fn input_only(mut self) -> Self {
        self.input_only = true;
        self
    }

    pub const fn path_param(mut self) -> Self {
        self.path_param = true;
        self
    }

    /// Effective operation. Reference fields are identity-bearing and always
    /// recreate, whatever the table says.
    pub fn effective_operation(&self) -> Operation {
        match self.kind {
            FieldKind::Reference => Operation::Recreate,
            _ => self.operation,
        }
    }

    /// Whether `value` counts as setting this field. Marker objects (no
    /// modelled fields) are set as soon as they are present at all.
    pub fn is_set(&self, value: Option<&Value>) -> bool {
        match (self.kind, value) {
            (_, None) => false,
            (FieldKind::Object(sub), Some(Value::Object(n))) if sub.is_marker() => !n.is_absent(),
            (_, Some(Value::Object(Nested::Present(_)))) => true,
            (_, Some(v)) => !v.is_empty(),
        }
    }

    /// Whether a change in this field, or anywhere below it, is covered by
    /// the named update operation.
    pub fn owned_by(&self, operation: &str) -> bool {
        if let Operation::Triggers(ops) = self.effective_operation() {
            if ops.iter().any(|op| *op == operation) {
                return true;
            }
        }
        match self.kind {
            FieldKind::Object(s) | FieldKind::ObjectList(s) | FieldKind::ObjectSet(s) => {
                s.fields.iter().any(|f| f.owned_by(operation))
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    ExactlyOne,
    AtMostOne,
}

/// Mutually exclusive fields of one object. Selecting one variant makes the
/// others explicitly empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Union {
    pub members: &'static [&'static str],
    pub kind: UnionKind,
}

impl Union {
    pub const fn exactly_one(members: &'static [&'static str]) -> Self {
        Self {
            members,
            kind: UnionKind::ExactlyOne,
        }
    }

    pub const fn at_most_one(members: &'static [&'static str]) -> Self {
        Self {
            members,
            kind: UnionKind::AtMostOne,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectSchema {
    pub name: &'static str,
    pub fields: &'static [Field],
    pub unions: &'static [Union],
}

impl ObjectSchema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// An object whose presence is the whole signal, sent as `{}`.
    pub fn is_marker(&self) -> bool {
        self.fields.is_empty()
    }
}

/// URL path templates relative to the API base path. Placeholders are
/// `{{field}}`; a template may carry a query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlTemplates {
    pub get: &'static str,
    pub list: &'static str,
    pub create: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
}

#[derive(Debug, PartialEq)]
pub struct ResourceSchema {
    /// Resource type name, e.g. `UptimeCheckConfig`.
    pub kind: &'static str,
    pub root: ObjectSchema,
    pub urls: UrlTemplates,
    /// Key of the items array in list responses.
    pub list_key: &'static str,
    /// Fields that make up the identity key, in URL order.
    pub identity: &'static [&'static str],
    /// Fields that identify the list parent.
    pub parent: &'static [&'static str],
    /// The server assigns `name` on create; callers must leave it unset.
    pub server_generated_name: bool,
    /// Update operations in the order they should run.
    pub update_operations: &'static [&'static str],
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.root.field(name)
    }
}
