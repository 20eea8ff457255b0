//! Canonicalization of desired, initial and new state.
//!
//! Normalizes two trees so that values the API treats as equivalent compare
//! equal, which keeps the differ from firing on cosmetic differences.
//!
//! - [`canonicalize_desired`]: fill the caller's unset fields from the
//!   observed state, prefer observed values that are semantically equal, and
//!   select union variants
//! - [`canonicalize_initial`]: resolve observed states that carry more than
//!   one member of a union
//! - [`canonicalize_new`]: prefer the caller's spelling wherever freshly read
//!   state is semantically equal to it

use halyard_core::names::name_equivalent;
use halyard_core::wire::fill_defaults;
use halyard_core::{Field, FieldKind, Nested, Object, ObjectSchema, Resource, Value};

use crate::diff::diff_objects;

/// Canonicalize `raw_desired` against the observed `raw_initial` (absent
/// when the resource does not exist yet).
pub fn canonicalize_desired(raw_desired: &Resource, raw_initial: Option<&Resource>) -> Resource {
    let schema = raw_desired.schema();
    let fields = desired_object(
        &schema.root,
        raw_desired.fields(),
        raw_initial.map(Resource::fields),
    );
    Resource::from_fields(schema, fields)
}

/// Canonicalize an observed state against the caller's desired state.
pub fn canonicalize_initial(raw_initial: &Resource, raw_desired: &Resource) -> Resource {
    let schema = raw_initial.schema();
    let mut fields = raw_initial.fields().clone();
    resolve_unions(&schema.root, &mut fields, raw_desired.fields());
    Resource::from_fields(schema, fields)
}

/// Canonicalize freshly read state against the caller's desired state.
pub fn canonicalize_new(raw_new: &Resource, raw_desired: &Resource) -> Resource {
    let schema = raw_new.schema();
    let fields = new_object(&schema.root, raw_new.fields(), raw_desired.fields());
    Resource::from_fields(schema, fields)
}

/// Fill fields missing from `fetched` with values from a create response.
///
/// A Get issued right after a create may lag behind; the create response is
/// authoritative for the fields it carries.
pub fn overlay_response(fetched: &Resource, response: &Resource) -> Resource {
    let mut fields = fetched.fields().clone();
    for field in fetched.schema().root.fields {
        if fields.get(field.name).is_none() {
            fields.set_opt(field.name, response.get(field.name).cloned());
        }
    }
    Resource::from_fields(fetched.schema(), fields)
}

/// Type-specific equality used to decide that two spellings mean the same.
fn semantically_equal(kind: FieldKind, a: &Value, b: &Value) -> bool {
    match (kind, a, b) {
        (FieldKind::String, Value::String(x), Value::String(y)) => x.trim() == y.trim(),
        (FieldKind::Reference, Value::String(x), Value::String(y)) => name_equivalent(x, y),
        (FieldKind::StringList, Value::StringArray(x), Value::StringArray(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| x.trim() == y.trim())
        }
        (FieldKind::StringSet, Value::StringArray(x), Value::StringArray(y)) => {
            let mut x: Vec<&str> = x.iter().map(|s| s.trim()).collect();
            let mut y: Vec<&str> = y.iter().map(|s| s.trim()).collect();
            x.sort_unstable();
            y.sort_unstable();
            x == y
        }
        _ => a == b,
    }
}

fn desired_object(schema: &ObjectSchema, desired: &Object, initial: Option<&Object>) -> Object {
    let mut out = Object::new();
    for field in schema.fields {
        let value = desired_field(
            field,
            desired.get(field.name),
            initial.and_then(|i| i.get(field.name)),
        );
        out.set_opt(field.name, value);
    }
    select_union_variants(schema, &mut out, desired);
    fill_defaults(schema, &mut out);
    out
}

fn desired_field(field: &Field, desired: Option<&Value>, initial: Option<&Value>) -> Option<Value> {
    if field.output_only {
        return initial.cloned();
    }
    match field.kind {
        FieldKind::Object(sub) => desired_nested(sub, desired, initial),
        FieldKind::ObjectList(sub) | FieldKind::ObjectSet(sub) => {
            let set = matches!(field.kind, FieldKind::ObjectSet(_));
            desired_collection(sub, set, desired, initial)
        }
        // A zero value counts as unset: it adopts initial and takes defaults.
        kind => match (desired, initial) {
            (None, initial) => initial.cloned(),
            (Some(d), initial) if d.is_empty() => initial.cloned(),
            (Some(d), Some(i)) if semantically_equal(kind, d, i) => Some(i.clone()),
            (Some(d), _) => Some(d.clone()),
        },
    }
}

fn as_nested(value: Option<&Value>) -> &Nested {
    static ABSENT: Nested = Nested::Absent;
    match value {
        Some(Value::Object(n)) => n,
        _ => &ABSENT,
    }
}

fn desired_nested(
    sub: &ObjectSchema,
    desired: Option<&Value>,
    initial: Option<&Value>,
) -> Option<Value> {
    let nested = match (as_nested(desired), as_nested(initial)) {
        (Nested::Absent, Nested::Present(i)) => {
            let mut adopted = i.clone();
            fill_defaults(sub, &mut adopted);
            Nested::Present(adopted)
        }
        (Nested::Absent, other) => other.clone(),
        (Nested::ExplicitEmpty, _) => Nested::ExplicitEmpty,
        (Nested::Present(d), Nested::Present(i)) => Nested::Present(desired_object(sub, d, Some(i))),
        (Nested::Present(d), _) => Nested::Present(desired_object(sub, d, None)),
    };
    (!nested.is_absent()).then_some(Value::Object(nested))
}

fn items(value: Option<&Value>) -> &[Object] {
    match value {
        Some(Value::ObjectArray(items)) => items,
        _ => &[],
    }
}

fn desired_collection(
    sub: &ObjectSchema,
    set: bool,
    desired: Option<&Value>,
    initial: Option<&Value>,
) -> Option<Value> {
    let d = items(desired);
    let i = items(initial);
    if d.is_empty() {
        return initial.or(desired).cloned();
    }

    let canonical = if set {
        // Each desired element adopts the observed element it matches.
        let mut remaining: Vec<&Object> = i.iter().collect();
        d.iter()
            .map(|item| {
                let found = remaining.iter().position(|candidate| {
                    diff_objects(sub, &desired_object(sub, item, Some(candidate)), candidate)
                        .is_empty()
                });
                match found {
                    Some(pos) => desired_object(sub, item, Some(remaining.swap_remove(pos))),
                    None => desired_object(sub, item, None),
                }
            })
            .collect()
    } else if d.len() == i.len() {
        d.iter()
            .zip(i)
            .map(|(d, i)| desired_object(sub, d, Some(i)))
            .collect()
    } else {
        d.iter().map(|d| desired_object(sub, d, None)).collect()
    };
    Some(Value::ObjectArray(canonical))
}

/// Clear a union member that lost the selection. Non-marker objects become
/// explicitly empty; marker objects and scalars are unset.
fn clear_member(schema: &ObjectSchema, obj: &mut Object, member: &str) {
    match schema.field(member).map(|f| f.kind) {
        Some(FieldKind::Object(sub)) if !sub.is_marker() => {
            obj.set(member, Value::Object(Nested::ExplicitEmpty))
        }
        _ => {
            obj.remove(member);
        }
    }
}

fn member_set(schema: &ObjectSchema, obj: &Object, member: &str) -> bool {
    schema
        .field(member)
        .is_some_and(|f| f.is_set(obj.get(member)))
}

/// Once a union variant is chosen in `desired`, every other member is
/// cleared, whatever was inherited from observed state.
fn select_union_variants(schema: &ObjectSchema, out: &mut Object, desired: &Object) {
    for union in schema.unions {
        let Some(selected) = union
            .members
            .iter()
            .find(|m| member_set(schema, desired, m))
        else {
            continue;
        };
        for member in union.members.iter().filter(|m| *m != selected) {
            clear_member(schema, out, member);
        }
    }
}

/// Collapse observed states where several union members are populated,
/// keeping the member the caller selected (or the first populated one).
fn resolve_unions(schema: &ObjectSchema, initial: &mut Object, desired: &Object) {
    for union in schema.unions {
        let populated: Vec<&str> = union
            .members
            .iter()
            .copied()
            .filter(|m| member_set(schema, initial, m))
            .collect();
        if populated.len() < 2 {
            continue;
        }
        let keep = populated
            .iter()
            .copied()
            .find(|m| member_set(schema, desired, m))
            .unwrap_or(populated[0]);
        for member in populated.into_iter().filter(|m| *m != keep) {
            clear_member(schema, initial, member);
        }
    }

    for field in schema.fields {
        if let FieldKind::Object(sub) = field.kind {
            let desired_inner = desired.nested(field.name).as_object().cloned();
            if let Some(Value::Object(Nested::Present(inner))) = initial.get_mut(field.name) {
                resolve_unions(sub, inner, &desired_inner.unwrap_or_default());
            }
        }
    }
}

fn new_object(schema: &ObjectSchema, new: &Object, desired: &Object) -> Object {
    let mut out = Object::new();
    for field in schema.fields {
        let value = new_field(field, new.get(field.name), desired.get(field.name));
        out.set_opt(field.name, value);
    }
    out
}

fn new_field(field: &Field, new: Option<&Value>, desired: Option<&Value>) -> Option<Value> {
    if field.path_param || field.input_only {
        return desired.or(new).cloned();
    }
    if field.output_only {
        return new.cloned();
    }
    match field.kind {
        FieldKind::Object(sub) => {
            let nested = match (as_nested(new), as_nested(desired)) {
                (n, _) if sub.is_marker() => n.clone(),
                (n, d) if n.is_empty() && d.is_empty() && !d.is_absent() => d.clone(),
                (Nested::Present(n), Nested::Present(d)) => Nested::Present(new_object(sub, n, d)),
                (n, _) => n.clone(),
            };
            (!nested.is_absent()).then_some(Value::Object(nested))
        }
        FieldKind::ObjectList(sub) | FieldKind::ObjectSet(sub) => {
            let n = items(new);
            let d = items(desired);
            if n.is_empty() && d.is_empty() {
                return desired.or(new).cloned();
            }
            let canonical = if matches!(field.kind, FieldKind::ObjectSet(_)) {
                new_set(sub, n, d)
            } else if n.len() == d.len() {
                n.iter().zip(d).map(|(n, d)| new_object(sub, n, d)).collect()
            } else {
                n.to_vec()
            };
            Some(Value::ObjectArray(canonical))
        }
        kind => match (new, desired) {
            (n, Some(d)) if n.is_none_or(Value::is_empty) && d.is_empty() => Some(d.clone()),
            (Some(n), Some(d)) if semantically_equal(kind, n, d) => Some(d.clone()),
            (n, _) => n.cloned(),
        },
    }
}

/// Desired elements first, each replaced by its canonical observed match,
/// then observed elements nobody asked for.
fn new_set(sub: &ObjectSchema, new: &[Object], desired: &[Object]) -> Vec<Object> {
    let mut remaining: Vec<&Object> = new.iter().collect();
    let mut out = Vec::with_capacity(new.len());
    for d in desired {
        let found = remaining
            .iter()
            .position(|n| diff_objects(sub, d, &new_object(sub, n, d)).is_empty());
        if let Some(pos) = found {
            let n = remaining.swap_remove(pos);
            out.push(new_object(sub, n, d));
        }
    }
    out.extend(remaining.into_iter().cloned());
    out
}
