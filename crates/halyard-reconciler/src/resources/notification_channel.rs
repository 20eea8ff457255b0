//! `NotificationChannel`: where alerts are delivered.

use halyard_core::{Field, FieldKind, ObjectSchema, ResourceSchema, UrlTemplates};

pub const UPDATE: &str = "updateNotificationChannel";
const U: &[&str] = &[UPDATE];

pub static SCHEMA: ResourceSchema = ResourceSchema {
    kind: "NotificationChannel",
    root: ObjectSchema {
        name: "NotificationChannel",
        fields: &[
            Field::new("name", FieldKind::Reference),
            Field::new("type", FieldKind::String)
                .required()
                .recreate(),
            Field::new("displayName", FieldKind::String).triggers(U),
            Field::new("description", FieldKind::String).triggers(U),
            Field::new("labels", FieldKind::StringMap).triggers(U),
            Field::new("userLabels", FieldKind::StringMap).triggers(U),
            Field::new("enabled", FieldKind::Bool)
                .server_default()
                .triggers(U),
            Field::new(
                "verificationStatus",
                FieldKind::Enum(&[
                    "VERIFICATION_STATUS_UNSPECIFIED",
                    "UNVERIFIED",
                    "VERIFIED",
                ]),
            )
            .output_only(),
            Field::new("project", FieldKind::Reference)
                .path_param()
                .required(),
        ],
        unions: &[],
    },
    urls: UrlTemplates {
        get: "projects/{{project}}/notificationChannels/{{name}}",
        list: "projects/{{project}}/notificationChannels",
        create: "projects/{{project}}/notificationChannels",
        update: "projects/{{project}}/notificationChannels/{{name}}",
        delete: "projects/{{project}}/notificationChannels/{{name}}",
    },
    list_key: "notificationChannels",
    identity: &["project", "name"],
    parent: &["project"],
    server_generated_name: true,
    update_operations: &[UPDATE],
};
