//! Self-link and short-name helpers.
//!
//! The API accepts and returns identifiers either as bare names (`my-check`)
//! or as full resource paths (`projects/p/uptimeCheckConfigs/my-check`).

/// Last path segment of a self-link. Bare names are returned unchanged.
pub fn self_link_to_name(value: &str) -> &str {
    let trimmed = value.trim().trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, name)) => name,
        None => trimmed,
    }
}

/// Whether two identifiers refer to the same resource, ignoring any
/// self-link prefix.
pub fn name_equivalent(a: &str, b: &str) -> bool {
    self_link_to_name(a) == self_link_to_name(b)
}

/// Short name suitable for URL substitution.
///
/// Returns `None` when the value cannot name a resource: it is empty or
/// contains characters that would break the URL path.
pub fn normalize_identity(value: &str) -> Option<&str> {
    let name = self_link_to_name(value);
    if name.is_empty() || name.contains(['?', '#', ' ']) {
        return None;
    }
    Some(name)
}
