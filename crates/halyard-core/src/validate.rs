use crate::error::CoreError;
use crate::schema::{FieldKind, ObjectSchema, UnionKind};
use crate::value::{Nested, Object, Value};

/// Check structural invariants of a caller-supplied object: required fields
/// are set, union cardinality holds, and enum values are known.
///
/// Nested objects are checked only when present.
pub fn validate(schema: &ObjectSchema, obj: &Object) -> Result<(), CoreError> {
    validate_at(schema, obj, "")
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn validate_at(schema: &ObjectSchema, obj: &Object, path: &str) -> Result<(), CoreError> {
    for union in schema.unions {
        let count = union
            .members
            .iter()
            .filter(|m| schema.field(m).is_some_and(|f| f.is_set(obj.get(m))))
            .count();
        let members = union.members.join(", ");
        match union.kind {
            UnionKind::ExactlyOne if count != 1 => {
                return Err(CoreError::ExactlyOneOf {
                    path: path_or_root(path, schema),
                    members,
                    count,
                });
            }
            UnionKind::AtMostOne if count > 1 => {
                return Err(CoreError::AtMostOneOf {
                    path: path_or_root(path, schema),
                    members,
                    count,
                });
            }
            _ => {}
        }
    }

    for field in schema.fields {
        let field_path = join(path, field.name);
        let value = obj.get(field.name);

        if field.required && !field.output_only && !field.is_set(value) {
            return Err(CoreError::MissingField(field_path));
        }

        match (field.kind, value) {
            (FieldKind::Enum(allowed), Some(Value::String(s))) if !s.is_empty() => {
                if !allowed.iter().any(|a| *a == s.as_str()) {
                    return Err(CoreError::InvalidEnum {
                        path: field_path,
                        value: s.clone(),
                        allowed: allowed.join(", "),
                    });
                }
            }
            (FieldKind::Object(sub), Some(Value::Object(Nested::Present(inner)))) => {
                validate_at(sub, inner, &field_path)?;
            }
            (
                FieldKind::ObjectList(sub) | FieldKind::ObjectSet(sub),
                Some(Value::ObjectArray(items)),
            ) => {
                for (i, item) in items.iter().enumerate() {
                    validate_at(sub, item, &format!("{field_path}[{i}]"))?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn path_or_root(path: &str, schema: &ObjectSchema) -> String {
    if path.is_empty() {
        schema.name.to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Union};

    static MATCHER: ObjectSchema = ObjectSchema {
        name: "contentMatcher",
        fields: &[
            Field::new("content", FieldKind::String).required(),
            Field::new("matcher", FieldKind::Enum(&["CONTAINS_STRING", "MATCHES_REGEX"])),
        ],
        unions: &[],
    };

    static TARGET: ObjectSchema = ObjectSchema {
        name: "Target",
        fields: &[
            Field::new("displayName", FieldKind::String).required(),
            Field::new("monitoredResource", FieldKind::Object(&MATCHER)),
            Field::new("resourceGroup", FieldKind::Object(&MATCHER)),
            Field::new("contentMatchers", FieldKind::ObjectList(&MATCHER)),
        ],
        unions: &[Union::exactly_one(&["monitoredResource", "resourceGroup"])],
    };

    fn matcher(content: &str) -> Object {
        Object::new().with("content", Value::string(content))
    }

    #[test]
    fn missing_required_field() {
        let obj = Object::new().with("monitoredResource", Value::object(matcher("x")));
        let err = validate(&TARGET, &obj).unwrap_err();
        assert!(matches!(err, CoreError::MissingField(f) if f == "displayName"));
    }

    #[test]
    fn exactly_one_of_violations() {
        let none = Object::new().with("displayName", Value::string("t"));
        assert!(matches!(
            validate(&TARGET, &none),
            Err(CoreError::ExactlyOneOf { count: 0, .. })
        ));

        let both = none
            .clone()
            .with("monitoredResource", Value::object(matcher("a")))
            .with("resourceGroup", Value::object(matcher("b")));
        assert!(matches!(
            validate(&TARGET, &both),
            Err(CoreError::ExactlyOneOf { count: 2, .. })
        ));
    }

    #[test]
    fn explicit_empty_member_does_not_count_as_set() {
        let obj = Object::new()
            .with("displayName", Value::string("t"))
            .with("monitoredResource", Value::object(matcher("a")))
            .with("resourceGroup", Value::Object(Nested::ExplicitEmpty));
        assert!(validate(&TARGET, &obj).is_ok());
    }

    #[test]
    fn nested_collection_items_are_validated() {
        let obj = Object::new()
            .with("displayName", Value::string("t"))
            .with("resourceGroup", Value::object(matcher("a")))
            .with(
                "contentMatchers",
                Value::ObjectArray(vec![
                    matcher("ok"),
                    matcher("bad").with("matcher", Value::string("FUZZY")),
                ]),
            );
        let err = validate(&TARGET, &obj).unwrap_err();
        assert!(
            matches!(err, CoreError::InvalidEnum { path, .. } if path == "contentMatchers[1].matcher")
        );
    }
}
