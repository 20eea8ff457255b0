//! JSON manifests.
//!
//! A manifest is one object, or an array of objects, each naming its
//! resource type in `kind` next to the resource's own fields:
//!
//! ```json
//! { "kind": "Service", "name": "checkout", "displayName": "Checkout", "custom": {} }
//! ```

use std::path::Path;

use eyre::WrapErr;
use halyard_core::{ResourceSchema, Resource, Value};
use halyard_reconciler::resources;
use serde_json::Value as Json;

/// Read manifests from `path`, or from stdin when `path` is `-`.
pub fn read(path: &Path, default_project: Option<&str>) -> eyre::Result<Vec<Resource>> {
    let contents = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).wrap_err("failed to read manifest from stdin")?
    } else {
        std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read manifest {}", path.display()))?
    };
    let json: Json = serde_json::from_str(&contents)
        .wrap_err_with(|| format!("{} is not valid JSON", path.display()))?;
    parse(&json, default_project)
}

pub fn parse(json: &Json, default_project: Option<&str>) -> eyre::Result<Vec<Resource>> {
    match json {
        Json::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                parse_one(item, default_project).wrap_err_with(|| format!("manifest entry {i}"))
            })
            .collect(),
        other => Ok(vec![parse_one(other, default_project)?]),
    }
}

fn parse_one(json: &Json, default_project: Option<&str>) -> eyre::Result<Resource> {
    let mut body = json
        .as_object()
        .cloned()
        .ok_or_else(|| eyre::eyre!("a manifest must be a JSON object"))?;
    let kind = match body.remove("kind") {
        Some(Json::String(kind)) => kind,
        _ => return Err(eyre::eyre!("manifest is missing a string `kind`")),
    };
    let schema = schema_for(&kind)?;

    let mut resource = Resource::from_json(schema, &Json::Object(body))
        .wrap_err_with(|| format!("invalid {kind} manifest"))?;
    if let Some(project) = default_project {
        if resource.str("project").is_none() && schema.field("project").is_some() {
            resource.set("project", Value::string(project));
        }
    }
    Ok(resource)
}

pub fn schema_for(kind: &str) -> eyre::Result<&'static ResourceSchema> {
    resources::by_kind(kind).ok_or_else(|| {
        let known: Vec<&str> = resources::all().iter().map(|s| s.kind).collect();
        eyre::eyre!("unknown kind {kind}; expected one of {}", known.join(", "))
    })
}

/// A resource carrying only the parent fields needed to list `schema`.
pub fn parent(
    schema: &'static ResourceSchema,
    project: Option<&str>,
    service: Option<&str>,
) -> eyre::Result<Resource> {
    let mut parent = Resource::new(schema);
    for field in schema.parent {
        let value = match *field {
            "project" => project,
            "service" => service,
            _ => None,
        }
        .ok_or_else(|| eyre::eyre!("--{field} is required to list {}", schema.kind))?;
        parent.set(field, Value::string(value));
    }
    Ok(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_manifest_gets_default_project() {
        let resources = parse(
            &json!({ "kind": "Service", "name": "checkout", "custom": {} }),
            Some("my-project"),
        )
        .unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].kind(), "Service");
        assert_eq!(resources[0].str("project"), Some("my-project"));
    }

    #[test]
    fn explicit_project_wins() {
        let resources = parse(
            &json!([{ "kind": "Service", "name": "checkout", "project": "other" }]),
            Some("my-project"),
        )
        .unwrap();
        assert_eq!(resources[0].str("project"), Some("other"));
    }

    #[test]
    fn unknown_kind_lists_known_ones() {
        let err = parse(&json!({ "kind": "AlertPolicy" }), None).unwrap_err();
        assert!(err.to_string().contains("UptimeCheckConfig"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = parse(
            &json!({ "kind": "Service", "name": "checkout", "dispalyName": "x" }),
            None,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("dispalyName"));
    }

    #[test]
    fn parent_requires_service_for_objectives() {
        let schema = schema_for("ServiceLevelObjective").unwrap();
        assert!(parent(schema, Some("my-project"), None).is_err());

        let parent = parent(schema, Some("my-project"), Some("checkout")).unwrap();
        assert_eq!(parent.str("service"), Some("checkout"));
    }
}
