//! `Service`: a logical grouping that service level objectives hang off.

use halyard_core::{Field, FieldKind, ObjectSchema, ResourceSchema, UrlTemplates};

pub const UPDATE: &str = "updateService";
const U: &[&str] = &[UPDATE];

/// `custom: {}` marks a user-defined service; it has no fields of its own.
static CUSTOM: ObjectSchema = ObjectSchema {
    name: "custom",
    fields: &[],
    unions: &[],
};

static TELEMETRY: ObjectSchema = ObjectSchema {
    name: "telemetry",
    fields: &[Field::new("resourceName", FieldKind::String).triggers(U)],
    unions: &[],
};

pub static SCHEMA: ResourceSchema = ResourceSchema {
    kind: "Service",
    root: ObjectSchema {
        name: "Service",
        fields: &[
            Field::new("name", FieldKind::Reference).required(),
            Field::new("displayName", FieldKind::String).triggers(U),
            Field::new("custom", FieldKind::Object(&CUSTOM)).triggers(U),
            Field::new("telemetry", FieldKind::Object(&TELEMETRY)).triggers(U),
            Field::new("userLabels", FieldKind::StringMap).triggers(U),
            Field::new("project", FieldKind::Reference)
                .path_param()
                .required(),
        ],
        unions: &[],
    },
    urls: UrlTemplates {
        get: "projects/{{project}}/services/{{name}}",
        list: "projects/{{project}}/services",
        create: "projects/{{project}}/services?serviceId={{name}}",
        update: "projects/{{project}}/services/{{name}}",
        delete: "projects/{{project}}/services/{{name}}",
    },
    list_key: "services",
    identity: &["project", "name"],
    parent: &["project"],
    server_generated_name: false,
    update_operations: &[UPDATE],
};
