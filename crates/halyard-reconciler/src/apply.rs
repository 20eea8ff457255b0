//! The apply loop: one reconciliation pass wrapped in a conflict-retry
//! envelope.

use halyard_core::Resource;
use tracing::Instrument;
use uuid::Uuid;

use crate::actuate::actuate;
use crate::cancel::CancelSignal;
use crate::canonicalize::{
    canonicalize_desired, canonicalize_initial, canonicalize_new, overlay_response,
};
use crate::client::Client;
use crate::diff::diff;
use crate::error::ReconcileError;
use crate::fetch;
use crate::options::ApplyOptions;
use crate::plan::{ApiOperation, plan};

/// Drive `raw_desired` to convergence and return the resulting state.
///
/// A conflict (HTTP 409) anywhere in the pass restarts it from a fresh read,
/// paced by the client's retry policy. Other errors end the apply.
pub async fn apply(
    client: &Client,
    raw_desired: &Resource,
    options: &ApplyOptions,
    cancel: &CancelSignal,
) -> Result<Resource, ReconcileError> {
    let span = tracing::info_span!(
        "apply",
        request_id = %Uuid::new_v4(),
        kind = raw_desired.kind(),
    );
    apply_with_retry(client, raw_desired, options, cancel)
        .instrument(span)
        .await
}

async fn apply_with_retry(
    client: &Client,
    raw_desired: &Resource,
    options: &ApplyOptions,
    cancel: &CancelSignal,
) -> Result<Resource, ReconcileError> {
    let mut failures = 0;
    loop {
        let err = match apply_once(client, raw_desired, options, cancel).await {
            Ok(state) => return Ok(state),
            Err(e) if e.is_conflict() => e,
            Err(e) => return Err(e),
        };

        failures += 1;
        let Some(delay) = client.retry_policy().next_delay(failures) else {
            tracing::warn!(attempts = failures, error = %err, "giving up after repeated conflicts");
            return Err(err);
        };
        tracing::warn!(
            attempt = failures,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "conflict, retrying apply"
        );
        if !cancel.sleep(delay).await {
            return Err(ReconcileError::Cancelled(format!(
                "waiting to retry {raw_desired}"
            )));
        }
    }
}

async fn apply_once(
    client: &Client,
    raw_desired: &Resource,
    options: &ApplyOptions,
    cancel: &CancelSignal,
) -> Result<Resource, ReconcileError> {
    raw_desired
        .validate()
        .map_err(|source| ReconcileError::Validation {
            kind: raw_desired.kind(),
            source,
        })?;

    let initial = fetch_initial(client, raw_desired, options, cancel).await?;
    let exists = initial.is_some();

    let lifecycle = options.lifecycle;
    if !exists && lifecycle.block_creation {
        return Err(ReconcileError::ApplyInfeasible(format!(
            "{raw_desired} does not exist and creation is blocked"
        )));
    }
    if exists && lifecycle.block_acquire && options.state_hint.is_none() {
        return Err(ReconcileError::ApplyInfeasible(format!(
            "{raw_desired} already exists and acquiring it is blocked"
        )));
    }

    let initial = initial.map(|i| canonicalize_initial(&i, raw_desired));
    let mut desired = canonicalize_desired(raw_desired, initial.as_ref());

    let diffs = match &initial {
        Some(initial) => diff(Some(&desired), Some(initial))?,
        None => Vec::new(),
    };
    if exists && lifecycle.block_modification && !diffs.is_empty() {
        let fields: Vec<&str> = diffs.iter().map(|d| d.field.as_str()).collect();
        return Err(ReconcileError::ApplyInfeasible(format!(
            "{raw_desired} differs in {} and modification is blocked",
            fields.join(", ")
        )));
    }

    let mut ops = plan(raw_desired.schema(), &diffs, exists)?;
    if ops.is_empty() {
        tracing::info!(resource = %desired, "resource is up to date");
    } else {
        tracing::info!(
            resource = %desired,
            diffs = diffs.len(),
            operations = ops.len(),
            "reconciling resource"
        );
    }
    actuate(client, &mut ops, &mut desired, cancel).await?;

    let mut raw_new = fetch::get_raw(client, &desired, cancel).await?;
    if let Some(ApiOperation::Create {
        response: Some(body),
    }) = ops.last()
    {
        match Resource::from_response(raw_desired.schema(), body) {
            Ok(mut created) => {
                fetch::adopt_identity(&mut created, &desired);
                raw_new = overlay_response(&raw_new, &created);
            }
            Err(e) => tracing::warn!(error = %e, "ignoring undecodable create response"),
        }
    }

    let new_state = canonicalize_new(&raw_new, raw_desired);
    let new_desired = canonicalize_desired(raw_desired, Some(&new_state));
    let remaining = diff(Some(&new_desired), Some(&new_state))?;
    if remaining.is_empty() {
        return Ok(new_state);
    }

    for d in &remaining {
        tracing::warn!(resource = %new_state, diff = %d, "diff remains after apply");
    }
    Err(ReconcileError::DiffAfterApply {
        diffs: remaining.iter().map(ToString::to_string).collect(),
        state: Box::new(new_state),
    })
}

/// Observed state before the pass, or `None` when the resource has to be
/// created: its identity is not known yet or the server has no such object.
async fn fetch_initial(
    client: &Client,
    raw_desired: &Resource,
    options: &ApplyOptions,
    cancel: &CancelSignal,
) -> Result<Option<Resource>, ReconcileError> {
    let lookup = options.state_hint.as_ref().unwrap_or(raw_desired);
    if lookup.identity().is_none() {
        tracing::debug!(resource = %lookup, "identity not resolvable, creating");
        return Ok(None);
    }
    match fetch::get_raw(client, lookup, cancel).await {
        Ok(raw) => Ok(Some(canonicalize_new(&raw, raw_desired))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use halyard_transport::Method;
    use halyard_transport::fake::FakeTransport;
    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::options::Lifecycle;
    use crate::resources::service;

    const URL: &str = "https://monitoring.googleapis.com/v3/projects/my-project/services/checkout";
    const LIST: &str = "https://monitoring.googleapis.com/v3/projects/my-project/services";

    fn checkout(display: &str) -> Resource {
        Resource::from_json(
            &service::SCHEMA,
            &json!({
                "project": "my-project",
                "name": "checkout",
                "displayName": display,
                "custom": {},
            }),
        )
        .unwrap()
    }

    fn remote(display: &str) -> serde_json::Value {
        json!({
            "name": "projects/my-project/services/checkout",
            "displayName": display,
            "custom": {},
        })
    }

    #[tokio::test]
    async fn block_creation_refuses_missing_resource() {
        let fake = Arc::new(FakeTransport::new());
        let client = Client::new(Config::default(), fake.clone());
        let options = ApplyOptions::default().with_lifecycle(Lifecycle {
            block_creation: true,
            ..Lifecycle::default()
        });

        let err = apply(&client, &checkout("Checkout"), &options, &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ApplyInfeasible(_)));
        assert!(fake.mutating_requests().is_empty());
    }

    #[tokio::test]
    async fn block_acquire_and_modification() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::Get, URL, 200, remote("Old"));
        let client = Client::new(Config::default(), fake.clone());

        let acquire = ApplyOptions::default().with_lifecycle(Lifecycle {
            block_acquire: true,
            ..Lifecycle::default()
        });
        let err = apply(&client, &checkout("Checkout"), &acquire, &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ApplyInfeasible(_)));

        let modify = ApplyOptions::default().with_lifecycle(Lifecycle {
            block_modification: true,
            ..Lifecycle::default()
        });
        let err = apply(&client, &checkout("Checkout"), &modify, &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ApplyInfeasible(msg) if msg.contains("displayName")));
        assert!(fake.mutating_requests().is_empty());
    }

    #[tokio::test]
    async fn state_hint_supplies_identity_and_allows_acquire() {
        use crate::resources::notification_channel;

        let url = "https://monitoring.googleapis.com/v3/projects/my-project/notificationChannels/123";
        let remote = |display: &str| {
            json!({
                "name": "projects/my-project/notificationChannels/123",
                "type": "email",
                "displayName": display,
                "labels": { "email_address": "oncall@example.com" },
            })
        };
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::Get, url, 200, remote("Old"));
        fake.respond(Method::Get, url, 200, remote("Old"));
        fake.respond(Method::Get, url, 200, remote("On-call"));
        fake.respond(Method::Patch, url, 200, remote("On-call"));
        let client = Client::new(Config::default(), fake.clone());

        // The server picked the name, so only the hint knows it.
        let desired = Resource::from_json(
            &notification_channel::SCHEMA,
            &json!({
                "project": "my-project",
                "type": "email",
                "displayName": "On-call",
                "labels": { "email_address": "oncall@example.com" },
            }),
        )
        .unwrap();
        let hint = Resource::new(&notification_channel::SCHEMA)
            .with("project", halyard_core::Value::string("my-project"))
            .with("name", halyard_core::Value::string("123"));
        let options = ApplyOptions::default()
            .with_lifecycle(Lifecycle {
                block_acquire: true,
                ..Lifecycle::default()
            })
            .with_state_hint(hint);

        let state = apply(&client, &desired, &options, &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(state.str("name"), Some("123"));
        assert_eq!(state.str("displayName"), Some("On-call"));
        assert_eq!(fake.count(Method::Post), 0);
        let patch = fake.mutating_requests().remove(0);
        assert_eq!(patch.url, url);
        assert_eq!(patch.query_param("updateMask"), Some("displayName"));
    }

    #[tokio::test]
    async fn validation_failure_sends_nothing() {
        let fake = Arc::new(FakeTransport::new());
        let client = Client::new(Config::default(), fake.clone());
        let unnamed = Resource::new(&service::SCHEMA)
            .with("project", halyard_core::Value::string("my-project"));

        let err = apply(&client, &unnamed, &ApplyOptions::default(), &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validation { kind: "Service", .. }));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn create_then_converge() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::Get, URL, 404, json!({}));
        fake.respond(Method::Get, URL, 200, remote("Checkout"));
        fake.respond(Method::Post, LIST, 200, remote("Checkout"));
        let client = Client::new(Config::default(), fake.clone());

        let state = apply(
            &client,
            &checkout("Checkout"),
            &ApplyOptions::default(),
            &CancelSignal::never(),
        )
        .await
        .unwrap();

        assert_eq!(state.str("name"), Some("checkout"));
        assert_eq!(state.str("displayName"), Some("Checkout"));
        let post = &fake.mutating_requests()[0];
        assert_eq!(post.query_param("serviceId"), Some("checkout"));
        assert_eq!(post.body.as_ref().unwrap()["custom"], json!({}));
    }
}
