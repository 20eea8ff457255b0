//! Schema tables for the supported Cloud Monitoring resource types.

use halyard_core::ResourceSchema;

pub mod notification_channel;
pub mod service;
pub mod service_level_objective;
pub mod uptime_check_config;

/// Every supported resource type.
pub fn all() -> [&'static ResourceSchema; 4] {
    [
        &notification_channel::SCHEMA,
        &service::SCHEMA,
        &service_level_objective::SCHEMA,
        &uptime_check_config::SCHEMA,
    ]
}

/// Look up a schema by its `kind`, e.g. `UptimeCheckConfig`.
pub fn by_kind(kind: &str) -> Option<&'static ResourceSchema> {
    all().into_iter().find(|s| s.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_resolve_to_schemas() {
        assert_eq!(by_kind("Service").map(|s| s.list_key), Some("services"));
        assert!(by_kind("AlertPolicy").is_none());
    }

    #[test]
    fn identity_fields_are_declared() {
        for schema in all() {
            for field in schema.identity.iter().chain(schema.parent) {
                assert!(
                    schema.field(field).is_some(),
                    "{} lacks identity field {field}",
                    schema.kind
                );
            }
        }
    }
}
