use halyard_core::names::self_link_to_name;
use halyard_core::wire::encode_filtered;
use halyard_core::{Resource, Value};
use halyard_transport::Method;
use serde_json::Value as Json;

use crate::cancel::CancelSignal;
use crate::client::Client;
use crate::error::ReconcileError;
use crate::fetch;
use crate::plan::{ApiOperation, update_mask};
use crate::url;

/// Execute `ops` in order against the API, stopping at the first failure.
///
/// A create may assign a server-generated name, which is written back into
/// `desired`; the raw create response is kept in the operation.
pub async fn actuate(
    client: &Client,
    ops: &mut [ApiOperation],
    desired: &mut Resource,
    cancel: &CancelSignal,
) -> Result<(), ReconcileError> {
    for op in ops.iter_mut() {
        match op {
            ApiOperation::Create { response } => {
                *response = Some(create(client, desired, cancel).await?);
            }
            ApiOperation::Update { name, diffs } => {
                tracing::info!(
                    resource = %desired,
                    operation = *name,
                    fields = diffs.len(),
                    "updating resource"
                );
                update(client, *name, &update_mask(diffs), desired, cancel).await?;
            }
        }
    }
    Ok(())
}

async fn create(
    client: &Client,
    desired: &mut Resource,
    cancel: &CancelSignal,
) -> Result<Json, ReconcileError> {
    let schema = desired.schema();
    if schema.server_generated_name && desired.name().is_some() {
        return Err(ReconcileError::InvalidArgument(format!(
            "{} names are assigned by the server; remove `name` to create one",
            schema.kind
        )));
    }
    tracing::info!(resource = %desired, "creating resource");

    let request = client
        .request(Method::Post, schema.urls.create, desired)?
        .with_body(Json::Object(desired.to_body()));
    let response = client
        .send_json(&request, cancel)
        .await
        .map_err(|e| ReconcileError::transport(format!("creating {desired}"), e))?;

    if schema.server_generated_name {
        if let Some(name) = response.get("name").and_then(Json::as_str) {
            desired.set("name", Value::string(self_link_to_name(name)));
        }
    }
    Ok(response)
}

async fn update(
    client: &Client,
    operation: &'static str,
    mask: &str,
    desired: &Resource,
    cancel: &CancelSignal,
) -> Result<(), ReconcileError> {
    let schema = desired.schema();
    fetch::get_raw(client, desired, cancel).await?;

    let mut body = encode_filtered(&schema.root, desired.fields(), |f| f.owned_by(operation));
    let path = url::expand("", schema.urls.get, |f| url::identity_value(desired, f))?;
    body.insert(
        "name".to_string(),
        Json::String(path.url.trim_start_matches('/').to_string()),
    );

    let request = client
        .request(Method::Patch, schema.urls.update, desired)?
        .with_query("updateMask", mask)
        .with_body(Json::Object(body));
    client
        .send(&request, cancel)
        .await
        .map_err(|e| ReconcileError::transport(format!("{operation} on {desired}"), e))?;
    Ok(())
}
