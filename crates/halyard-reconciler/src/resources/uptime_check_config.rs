//! `UptimeCheckConfig`: a periodic HTTP or TCP probe against a monitored
//! resource or a resource group.

use halyard_core::{
    Field, FieldKind, Literal, ObjectSchema, ResourceSchema, Union, UrlTemplates,
};

pub const UPDATE: &str = "updateUptimeCheckConfig";
const U: &[&str] = &[UPDATE];

static MONITORED_RESOURCE: ObjectSchema = ObjectSchema {
    name: "monitoredResource",
    fields: &[
        Field::new("type", FieldKind::String).required().recreate(),
        Field::new("labels", FieldKind::StringMap)
            .required()
            .recreate(),
    ],
    unions: &[],
};

static RESOURCE_GROUP: ObjectSchema = ObjectSchema {
    name: "resourceGroup",
    fields: &[
        Field::new("groupId", FieldKind::Reference),
        Field::new(
            "resourceType",
            FieldKind::Enum(&[
                "RESOURCE_TYPE_UNSPECIFIED",
                "INSTANCE",
                "AWS_ELB_LOAD_BALANCER",
            ]),
        )
        .recreate(),
    ],
    unions: &[],
};

static AUTH_INFO: ObjectSchema = ObjectSchema {
    name: "authInfo",
    fields: &[
        Field::new("username", FieldKind::String)
            .required()
            .triggers(U),
        // The API never returns the password.
        Field::new("password", FieldKind::String)
            .required()
            .input_only()
            .triggers(U),
    ],
    unions: &[],
};

static HTTP_CHECK: ObjectSchema = ObjectSchema {
    name: "httpCheck",
    fields: &[
        Field::new(
            "requestMethod",
            FieldKind::Enum(&["METHOD_UNSPECIFIED", "GET", "POST"]),
        )
        .default_to(Literal::Str("GET"))
        .recreate(),
        Field::new("useSsl", FieldKind::Bool).triggers(U),
        Field::new("path", FieldKind::String)
            .default_to(Literal::Str("/"))
            .triggers(U),
        Field::new("port", FieldKind::Integer)
            .server_default()
            .triggers(U),
        Field::new("authInfo", FieldKind::Object(&AUTH_INFO)).triggers(U),
        Field::new("maskHeaders", FieldKind::Bool).recreate(),
        // Masked headers come back as "******"; what was sent wins.
        Field::new("headers", FieldKind::StringMap)
            .server_default()
            .input_only()
            .triggers(U),
        Field::new(
            "contentType",
            FieldKind::Enum(&["TYPE_UNSPECIFIED", "URL_ENCODED"]),
        )
        .recreate(),
        Field::new("validateSsl", FieldKind::Bool).triggers(U),
        Field::new("body", FieldKind::String).triggers(U),
    ],
    unions: &[],
};

static TCP_CHECK: ObjectSchema = ObjectSchema {
    name: "tcpCheck",
    fields: &[Field::new("port", FieldKind::Integer)
        .required()
        .recreate()],
    unions: &[],
};

static CONTENT_MATCHER: ObjectSchema = ObjectSchema {
    name: "contentMatcher",
    fields: &[
        Field::new("content", FieldKind::String)
            .required()
            .recreate(),
        Field::new(
            "matcher",
            FieldKind::Enum(&[
                "CONTENT_MATCHER_OPTION_UNSPECIFIED",
                "CONTAINS_STRING",
                "NOT_CONTAINS_STRING",
                "MATCHES_REGEX",
                "NOT_MATCHES_REGEX",
            ]),
        )
        .recreate(),
    ],
    unions: &[],
};

pub static SCHEMA: ResourceSchema = ResourceSchema {
    kind: "UptimeCheckConfig",
    root: ObjectSchema {
        name: "UptimeCheckConfig",
        fields: &[
            Field::new("name", FieldKind::Reference),
            Field::new("displayName", FieldKind::String)
                .required()
                .triggers(U),
            Field::new("monitoredResource", FieldKind::Object(&MONITORED_RESOURCE)).recreate(),
            Field::new("resourceGroup", FieldKind::Object(&RESOURCE_GROUP)).recreate(),
            Field::new("httpCheck", FieldKind::Object(&HTTP_CHECK)).recreate(),
            Field::new("tcpCheck", FieldKind::Object(&TCP_CHECK)).triggers(U),
            Field::new("period", FieldKind::String)
                .default_to(Literal::Str("60s"))
                .triggers(U),
            Field::new("timeout", FieldKind::String)
                .required()
                .triggers(U),
            Field::new("contentMatchers", FieldKind::ObjectList(&CONTENT_MATCHER)).triggers(U),
            Field::new("selectedRegions", FieldKind::StringSet).triggers(U),
            Field::new("project", FieldKind::Reference)
                .path_param()
                .required(),
        ],
        unions: &[
            Union::exactly_one(&["monitoredResource", "resourceGroup"]),
            Union::at_most_one(&["httpCheck", "tcpCheck"]),
        ],
    },
    urls: UrlTemplates {
        get: "projects/{{project}}/uptimeCheckConfigs/{{name}}",
        list: "projects/{{project}}/uptimeCheckConfigs",
        create: "projects/{{project}}/uptimeCheckConfigs",
        update: "projects/{{project}}/uptimeCheckConfigs/{{name}}",
        delete: "projects/{{project}}/uptimeCheckConfigs/{{name}}",
    },
    list_key: "uptimeCheckConfigs",
    identity: &["project", "name"],
    parent: &["project"],
    server_generated_name: true,
    update_operations: &[UPDATE],
};

#[cfg(test)]
mod tests {
    use super::*;
    use halyard_core::Resource;
    use serde_json::json;

    #[test]
    fn group_id_is_identity_bearing() {
        let group = SCHEMA.field("resourceGroup").unwrap();
        let FieldKind::Object(sub) = group.kind else {
            panic!("resourceGroup is an object");
        };
        assert_eq!(
            sub.field("groupId").unwrap().effective_operation(),
            halyard_core::Operation::Recreate
        );
    }

    #[test]
    fn update_owns_nested_http_fields() {
        assert!(SCHEMA.field("httpCheck").unwrap().owned_by(UPDATE));
        assert!(!SCHEMA.field("monitoredResource").unwrap().owned_by(UPDATE));
    }

    #[test]
    fn manifest_requires_exactly_one_target() {
        let r = Resource::from_json(
            &SCHEMA,
            &json!({ "project": "p", "displayName": "x", "timeout": "10s" }),
        )
        .unwrap();
        assert!(r.validate().is_err());
    }
}
