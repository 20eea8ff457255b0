//! Structural diff of two canonical resource trees.
//!
//! Fields are visited in declaration order. Each difference carries the
//! operations needed to reconcile it, taken from the field's diff policy.

use std::fmt;

use halyard_core::names::name_equivalent;
use halyard_core::{Field, FieldKind, Nested, Object, ObjectSchema, Operation, Resource, Value};
use serde::Serialize;

use crate::error::ReconcileError;

/// What a single difference requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultingOperation {
    Recreate,
    Update(&'static str),
}

impl fmt::Display for ResultingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultingOperation::Recreate => f.write_str("Recreate"),
            ResultingOperation::Update(name) => f.write_str(name),
        }
    }
}

/// One field-level discrepancy between desired and actual state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    /// Dotted wire path, with `[i]` for list elements.
    pub field: String,
    pub desired: Option<Value>,
    pub actual: Option<Value>,
    pub operations: Vec<ResultingOperation>,
}

impl FieldDiff {
    pub fn requires_recreate(&self) -> bool {
        self.operations.contains(&ResultingOperation::Recreate)
    }

    pub fn triggers(&self, operation: &str) -> bool {
        self.operations
            .iter()
            .any(|op| matches!(op, ResultingOperation::Update(name) if *name == operation))
    }
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |v: &Option<Value>| match v {
            Some(v) => v.to_string(),
            None => "<unset>".to_string(),
        };
        let ops = self
            .operations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{}: desired {} != actual {} [{ops}]",
            self.field,
            render(&self.desired),
            render(&self.actual)
        )
    }
}

/// Diff two resources of the same type.
///
/// Both sides must be present; passing `None` is a caller bug, not a
/// user error.
pub fn diff(
    desired: Option<&Resource>,
    actual: Option<&Resource>,
) -> Result<Vec<FieldDiff>, ReconcileError> {
    let (Some(desired), Some(actual)) = (desired, actual) else {
        return Err(ReconcileError::InvalidArgument(
            "cannot diff an absent resource".to_string(),
        ));
    };
    if !std::ptr::eq(desired.schema(), actual.schema()) {
        return Err(ReconcileError::InvalidArgument(format!(
            "cannot diff {} against {}",
            desired.kind(),
            actual.kind()
        )));
    }
    Ok(diff_objects(
        &desired.schema().root,
        desired.fields(),
        actual.fields(),
    ))
}

/// Diff two objects shaped by `schema`.
pub fn diff_objects(schema: &ObjectSchema, desired: &Object, actual: &Object) -> Vec<FieldDiff> {
    let mut out = Vec::new();
    diff_into(schema, desired, actual, "", &mut out);
    out
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn operations_of(field: &Field) -> Vec<ResultingOperation> {
    match field.effective_operation() {
        Operation::Recreate => vec![ResultingOperation::Recreate],
        Operation::Triggers(ops) => ops.iter().copied().map(ResultingOperation::Update).collect(),
        Operation::Ignore => Vec::new(),
    }
}

fn whole(field: &Field, path: String, desired: Option<&Value>, actual: Option<&Value>) -> FieldDiff {
    FieldDiff {
        field: path,
        desired: desired.cloned(),
        actual: actual.cloned(),
        operations: operations_of(field),
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_empty)
}

/// Field equality as the differ sees it.
pub(crate) fn values_equal(kind: FieldKind, a: &Value, b: &Value) -> bool {
    match (kind, a, b) {
        (FieldKind::Reference, Value::String(x), Value::String(y)) => name_equivalent(x, y),
        (FieldKind::StringSet, Value::StringArray(x), Value::StringArray(y)) => {
            let mut x = x.clone();
            let mut y = y.clone();
            x.sort();
            y.sort();
            x == y
        }
        _ => a == b,
    }
}

fn diff_into(
    schema: &ObjectSchema,
    desired: &Object,
    actual: &Object,
    path: &str,
    out: &mut Vec<FieldDiff>,
) {
    for field in schema.fields {
        if field.output_only || field.effective_operation() == Operation::Ignore {
            continue;
        }
        let field_path = join(path, field.name);
        let d = desired.get(field.name);
        let a = actual.get(field.name);

        match field.kind {
            FieldKind::Object(sub) => diff_nested(
                field,
                sub,
                desired.nested(field.name),
                actual.nested(field.name),
                field_path,
                out,
            ),
            FieldKind::ObjectList(sub) | FieldKind::ObjectSet(sub) => {
                diff_collection(field, sub, d, a, field_path, out)
            }
            kind => {
                if field.server_default && is_empty(d) {
                    continue;
                }
                let equal = match (d, a) {
                    (Some(d), Some(a)) => values_equal(kind, d, a),
                    _ => is_empty(d) && is_empty(a),
                };
                if !equal {
                    out.push(whole(field, field_path, d, a));
                }
            }
        }
    }
}

fn diff_nested(
    field: &Field,
    sub: &ObjectSchema,
    desired: &Nested,
    actual: &Nested,
    path: String,
    out: &mut Vec<FieldDiff>,
) {
    let differs = match (desired, actual) {
        (Nested::Present(d), Nested::Present(a)) => {
            diff_into(sub, d, a, &path, out);
            return;
        }
        (Nested::Absent, _) if field.server_default => false,
        (d, a) if sub.is_marker() => d.is_absent() != a.is_absent(),
        (Nested::Absent | Nested::ExplicitEmpty, a) => !a.is_empty(),
        (Nested::Present(d), _) => !d.is_empty(),
    };
    if differs {
        let to_value = |n: &Nested| (!n.is_absent()).then(|| Value::Object(n.clone()));
        out.push(FieldDiff {
            field: path,
            desired: to_value(desired),
            actual: to_value(actual),
            operations: operations_of(field),
        });
    }
}

fn diff_collection(
    field: &Field,
    sub: &ObjectSchema,
    desired: Option<&Value>,
    actual: Option<&Value>,
    path: String,
    out: &mut Vec<FieldDiff>,
) {
    let items = |v: Option<&Value>| match v {
        Some(Value::ObjectArray(items)) => items.clone(),
        _ => Vec::new(),
    };
    let d = items(desired);
    let a = items(actual);

    if d.is_empty() {
        if !a.is_empty() && !field.server_default {
            out.push(whole(field, path, desired, actual));
        }
        return;
    }
    if d.len() != a.len() {
        out.push(whole(field, path, desired, actual));
        return;
    }

    match field.kind {
        FieldKind::ObjectSet(_) => {
            let mut unmatched: Vec<&Object> = a.iter().collect();
            for item in &d {
                match unmatched
                    .iter()
                    .position(|candidate| diff_objects(sub, item, candidate).is_empty())
                {
                    Some(i) => {
                        unmatched.swap_remove(i);
                    }
                    None => {
                        out.push(whole(field, path, desired, actual));
                        return;
                    }
                }
            }
        }
        _ => {
            for (i, (d, a)) in d.iter().zip(&a).enumerate() {
                diff_into(sub, d, a, &format!("{path}[{i}]"), out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::uptime_check_config::SCHEMA;
    use serde_json::json;

    fn resource(body: serde_json::Value) -> Resource {
        Resource::from_json(&SCHEMA, &body).unwrap()
    }

    fn base() -> serde_json::Value {
        json!({
            "project": "my-project",
            "name": "homepage",
            "displayName": "Homepage",
            "timeout": "10s",
            "period": "60s",
            "resourceGroup": { "groupId": "1234", "resourceType": "INSTANCE" },
            "httpCheck": { "path": "/", "port": 443, "useSsl": true },
        })
    }

    #[test]
    fn diff_is_reflexive() {
        let r = resource(base());
        assert!(diff(Some(&r), Some(&r)).unwrap().is_empty());
    }

    #[test]
    fn absent_side_is_an_error() {
        let r = resource(base());
        assert!(matches!(
            diff(None, Some(&r)),
            Err(ReconcileError::InvalidArgument(_))
        ));
        assert!(diff(Some(&r), None).is_err());
    }

    #[test]
    fn updatable_field_triggers_named_operation() {
        let desired = resource(base());
        let mut actual_json = base();
        actual_json["displayName"] = json!("Old homepage");
        let actual = resource(actual_json);

        let diffs = diff(Some(&desired), Some(&actual)).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "displayName");
        assert!(diffs[0].triggers("updateUptimeCheckConfig"));
        assert!(!diffs[0].requires_recreate());
    }

    #[test]
    fn reference_change_requires_recreate() {
        let desired = resource(base());
        let mut actual_json = base();
        actual_json["resourceGroup"]["groupId"] = json!("9999");
        let actual = resource(actual_json);

        let diffs = diff(Some(&desired), Some(&actual)).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "resourceGroup.groupId");
        assert!(diffs[0].requires_recreate());
    }

    #[test]
    fn reference_compares_by_short_name() {
        let desired = resource(base());
        let mut actual_json = base();
        actual_json["resourceGroup"]["groupId"] = json!("projects/my-project/groups/1234");
        let actual = resource(actual_json);

        assert!(diff(Some(&desired), Some(&actual)).unwrap().is_empty());
    }

    #[test]
    fn nested_diff_uses_nested_policy() {
        let desired = resource(base());
        let mut actual_json = base();
        actual_json["httpCheck"]["path"] = json!("/healthz");
        let actual = resource(actual_json);

        let diffs = diff(Some(&desired), Some(&actual)).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "httpCheck.path");
        assert!(diffs[0].triggers("updateUptimeCheckConfig"));
    }

    #[test]
    fn server_default_suppresses_absent_desired() {
        let mut desired_json = base();
        desired_json["httpCheck"].as_object_mut().unwrap().remove("port");
        let desired = resource(desired_json);
        let actual = resource(base());

        assert!(diff(Some(&desired), Some(&actual)).unwrap().is_empty());
    }

    #[test]
    fn server_default_suppresses_zero_desired() {
        let mut desired_json = base();
        desired_json["httpCheck"]["port"] = json!(0);
        let desired = resource(desired_json);
        let actual = resource(base());

        assert!(diff(Some(&desired), Some(&actual)).unwrap().is_empty());
    }

    #[test]
    fn explicit_empty_against_absent_is_not_a_diff() {
        let mut desired_json = base();
        desired_json["tcpCheck"] = json!({});
        let desired = resource(desired_json);
        let actual = resource(base());

        assert!(diff(Some(&desired), Some(&actual)).unwrap().is_empty());
    }

    #[test]
    fn explicit_empty_against_present_requests_parent_operation() {
        let mut desired_json = base();
        desired_json["httpCheck"] = json!({});
        let desired = resource(desired_json);
        let actual = resource(base());

        let diffs = diff(Some(&desired), Some(&actual)).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "httpCheck");
        assert!(diffs[0].requires_recreate());
    }

    #[test]
    fn unordered_regions_compare_as_sets() {
        let mut desired_json = base();
        desired_json["selectedRegions"] = json!(["USA", "EUROPE", "ASIA_PACIFIC"]);
        let mut actual_json = base();
        actual_json["selectedRegions"] = json!(["EUROPE", "ASIA_PACIFIC", "USA"]);

        let diffs = diff(Some(&resource(desired_json)), Some(&resource(actual_json))).unwrap();
        assert!(diffs.is_empty());
    }

    #[test]
    fn content_matcher_length_change_is_whole_field() {
        let mut desired_json = base();
        desired_json["contentMatchers"] = json!([
            { "content": "ok", "matcher": "CONTAINS_STRING" },
            { "content": "error", "matcher": "NOT_CONTAINS_STRING" },
        ]);
        let mut actual_json = base();
        actual_json["contentMatchers"] = json!([{ "content": "ok", "matcher": "CONTAINS_STRING" }]);

        let diffs = diff(Some(&resource(desired_json)), Some(&resource(actual_json))).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "contentMatchers");
        assert!(diffs[0].triggers("updateUptimeCheckConfig"));
    }

    #[test]
    fn display_names_field_and_operation() {
        let d = FieldDiff {
            field: "period".to_string(),
            desired: Some(Value::string("300s")),
            actual: Some(Value::string("60s")),
            operations: vec![ResultingOperation::Update("updateUptimeCheckConfig")],
        };
        assert_eq!(
            d.to_string(),
            r#"period: desired "300s" != actual "60s" [updateUptimeCheckConfig]"#
        );
    }
}
