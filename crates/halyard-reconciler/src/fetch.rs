use halyard_core::names::self_link_to_name;
use halyard_core::{FieldKind, Resource, Value};
use halyard_transport::Method;

use crate::cancel::CancelSignal;
use crate::canonicalize::canonicalize_new;
use crate::client::Client;
use crate::error::ReconcileError;

/// Read the current state of `resource`, canonicalized against it.
///
/// `resource` only needs its identity fields set. A missing resource
/// surfaces as an error for which [`ReconcileError::is_not_found`] holds.
pub async fn get(
    client: &Client,
    resource: &Resource,
    cancel: &CancelSignal,
) -> Result<Resource, ReconcileError> {
    let fetched = get_raw(client, resource, cancel).await?;
    Ok(canonicalize_new(&fetched, resource))
}

/// Read and flatten without canonicalizing.
pub(crate) async fn get_raw(
    client: &Client,
    resource: &Resource,
    cancel: &CancelSignal,
) -> Result<Resource, ReconcileError> {
    let schema = resource.schema();
    let request = client.request(Method::Get, schema.urls.get, resource)?;
    tracing::debug!(kind = schema.kind, url = %request.url, "fetching resource");

    let body = client
        .send_json(&request, cancel)
        .await
        .map_err(|e| ReconcileError::transport(format!("getting {resource}"), e))?;
    let mut fetched = Resource::from_response(schema, &body).map_err(|source| {
        ReconcileError::Decode {
            kind: schema.kind,
            source,
        }
    })?;
    adopt_identity(&mut fetched, resource);
    Ok(fetched)
}

/// Copy URL-only fields from the request and reduce identity self-links to
/// short names.
pub(crate) fn adopt_identity(fetched: &mut Resource, request: &Resource) {
    let schema = fetched.schema();
    for field in schema.root.fields.iter().filter(|f| f.path_param) {
        if let Some(value) = request.get(field.name) {
            fetched.set(field.name, value.clone());
        }
    }
    for name in schema.identity {
        let short = match (schema.field(name).map(|f| f.kind), fetched.str(name)) {
            (Some(FieldKind::Reference), Some(value)) => self_link_to_name(value).to_string(),
            _ => continue,
        };
        fetched.set(name, Value::String(short));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use halyard_transport::fake::FakeTransport;
    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::resources::service;

    const URL: &str = "https://monitoring.googleapis.com/v3/projects/my-project/services/checkout";

    fn checkout() -> Resource {
        Resource::from_json(
            &service::SCHEMA,
            &json!({ "project": "my-project", "name": "checkout", "custom": {} }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn get_shortens_name_and_keeps_project() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            Method::Get,
            URL,
            200,
            json!({
                "name": "projects/123456/services/checkout",
                "displayName": "Checkout",
                "custom": {},
            }),
        );
        let client = Client::new(Config::default(), fake.clone());

        let got = get(&client, &checkout(), &CancelSignal::never()).await.unwrap();
        assert_eq!(got.str("name"), Some("checkout"));
        assert_eq!(got.str("project"), Some("my-project"));
        assert_eq!(got.str("displayName"), Some("Checkout"));
        assert_eq!(fake.count(Method::Get), 1);
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let fake = Arc::new(FakeTransport::new());
        let client = Client::new(Config::default(), fake);

        let err = get(&client, &checkout(), &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[tokio::test]
    async fn unresolvable_identity_sends_nothing() {
        let fake = Arc::new(FakeTransport::new());
        let client = Client::new(Config::default(), fake.clone());
        let unnamed = Resource::new(&service::SCHEMA).with("project", Value::string("my-project"));

        let err = get(&client, &unnamed, &CancelSignal::never()).await.unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidArgument(_)));
        assert!(fake.requests().is_empty());
    }
}
