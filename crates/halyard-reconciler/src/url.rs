//! URL template expansion.
//!
//! Templates are relative to the API base path and use `{{field}}`
//! placeholders, e.g. `projects/{{project}}/services?serviceId={{name}}`.

use halyard_core::Resource;
use halyard_core::names::normalize_identity;

use crate::error::ReconcileError;

/// A concrete endpoint: absolute URL plus query parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub url: String,
    pub query: Vec<(String, String)>,
}

fn substitute(
    template: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, ReconcileError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            ReconcileError::InvalidArgument(format!("unterminated placeholder in {template}"))
        })?;
        let key = &after[..end];
        let value = lookup(key).ok_or_else(|| {
            ReconcileError::InvalidArgument(format!("{key} is required to build {template}"))
        })?;
        out.push_str(&value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Expand `template` under `base`, resolving placeholders through `lookup`.
pub fn expand(
    base: &str,
    template: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Endpoint, ReconcileError> {
    let (path, query) = match template.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (template, None),
    };

    let url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        substitute(path, &lookup)?.trim_start_matches('/')
    );

    let mut params = Vec::new();
    for pair in query.into_iter().flat_map(|q| q.split('&')) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.push((key.to_string(), substitute(value, &lookup)?));
    }
    Ok(Endpoint { url, query: params })
}

/// Identity value of `field` as it should appear in a URL.
///
/// Self-links are reduced to short names. A value that cannot be normalized
/// is used verbatim and logged, so a malformed identifier surfaces as a
/// server error rather than disappearing.
pub fn identity_value(resource: &Resource, field: &str) -> Option<String> {
    let raw = resource.str(field)?;
    match normalize_identity(raw) {
        Some(name) => Some(name.to_string()),
        None => {
            tracing::warn!(
                kind = resource.kind(),
                field,
                value = raw,
                "identity value could not be normalized, using it verbatim"
            );
            Some(raw.to_string())
        }
    }
}

/// Expand `template` using the identity fields of `resource`.
pub fn for_resource(
    base: &str,
    template: &str,
    resource: &Resource,
) -> Result<Endpoint, ReconcileError> {
    expand(base, template, |field| identity_value(resource, field))
}
