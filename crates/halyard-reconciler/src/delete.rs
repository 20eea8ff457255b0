use halyard_core::Resource;
use halyard_transport::Method;

use crate::cancel::CancelSignal;
use crate::client::Client;
use crate::error::ReconcileError;
use crate::fetch;
use crate::list::list;

/// How many times a delete is confirmed by reading the resource back.
pub const DELETE_CONFIRMATION_ATTEMPTS: u32 = 10;

/// Delete `resource` and wait until reads stop finding it.
///
/// Deleting something that is already gone succeeds.
pub async fn delete(
    client: &Client,
    resource: &Resource,
    cancel: &CancelSignal,
) -> Result<(), ReconcileError> {
    match fetch::get_raw(client, resource, cancel).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            tracing::info!(resource = %resource, "already deleted");
            return Ok(());
        }
        Err(e) if e.is_cancelled() => return Err(e),
        Err(e) => {
            tracing::warn!(resource = %resource, error = %e, "existence check failed, deleting anyway");
        }
    }

    tracing::info!(resource = %resource, "deleting resource");
    let request = client.request(Method::Delete, resource.schema().urls.delete, resource)?;
    match client.send(&request, cancel).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(ReconcileError::transport(format!("deleting {resource}"), e)),
    }

    let interval = client.config().poll_interval();
    for attempt in 1..=DELETE_CONFIRMATION_ATTEMPTS {
        match fetch::get_raw(client, resource, cancel).await {
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
            Ok(_) => {
                tracing::debug!(resource = %resource, attempt, "still present after delete");
                if attempt == DELETE_CONFIRMATION_ATTEMPTS {
                    break;
                }
                if !cancel.sleep(interval).await {
                    return Err(ReconcileError::Cancelled(format!(
                        "confirming deletion of {resource}"
                    )));
                }
            }
        }
    }
    Err(ReconcileError::NotDeleted {
        resource: resource.to_string(),
        attempts: DELETE_CONFIRMATION_ATTEMPTS,
    })
}

/// Delete every resource under `parent` accepted by `filter`.
///
/// Individual failures do not stop the sweep; they are returned together
/// once every page has been visited. On success, returns how many
/// resources were deleted.
pub async fn delete_all(
    client: &Client,
    parent: &Resource,
    filter: impl Fn(&Resource) -> bool,
    cancel: &CancelSignal,
) -> Result<usize, ReconcileError> {
    let mut page = list(client, parent, cancel).await?;
    let mut deleted = 0;
    let mut errors = Vec::new();
    loop {
        for item in page.items() {
            if !filter(item) {
                continue;
            }
            match delete(client, item, cancel).await {
                Ok(()) => deleted += 1,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!(resource = %item, error = %e, "delete failed");
                    errors.push(e);
                }
            }
        }
        if !page.has_next() {
            break;
        }
        page.next(client, cancel).await?;
    }

    tracing::info!(
        kind = parent.kind(),
        deleted,
        failed = errors.len(),
        "delete sweep finished"
    );
    if errors.is_empty() {
        Ok(deleted)
    } else {
        Err(ReconcileError::Multiple(errors))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use halyard_core::Value;
    use halyard_transport::fake::FakeTransport;
    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::resources::notification_channel::SCHEMA;

    const BASE: &str = "https://monitoring.googleapis.com/v3/projects/my-project/notificationChannels";

    fn fast_config() -> Config {
        Config {
            poll_interval_ms: 1,
            ..Config::default()
        }
    }

    fn channel(name: &str) -> Resource {
        Resource::new(&SCHEMA)
            .with("project", Value::string("my-project"))
            .with("name", Value::string(name))
    }

    fn remote(name: &str) -> serde_json::Value {
        json!({ "name": format!("projects/my-project/notificationChannels/{name}"), "type": "email" })
    }

    #[tokio::test]
    async fn delete_polls_until_gone() {
        let url = format!("{BASE}/123");
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::Get, &url, 200, remote("123"));
        fake.respond(Method::Get, &url, 200, remote("123"));
        fake.respond(Method::Get, &url, 404, json!({}));
        fake.respond(Method::Delete, &url, 200, json!({}));
        let client = Client::new(fast_config(), fake.clone());

        delete(&client, &channel("123"), &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(fake.count(Method::Delete), 1);
        assert_eq!(fake.count(Method::Get), 3);
    }

    #[tokio::test]
    async fn delete_of_missing_resource_sends_no_delete() {
        let fake = Arc::new(FakeTransport::new());
        let client = Client::new(fast_config(), fake.clone());

        delete(&client, &channel("123"), &CancelSignal::never())
            .await
            .unwrap();
        assert!(fake.mutating_requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_gives_up_after_confirmation_attempts() {
        let url = format!("{BASE}/123");
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::Get, &url, 200, remote("123"));
        fake.respond(Method::Delete, &url, 200, json!({}));
        let client = Client::new(Config::default(), fake.clone());

        let started = tokio::time::Instant::now();
        let err = delete(&client, &channel("123"), &CancelSignal::never())
            .await
            .unwrap_err();

        // No wait after the final read.
        let interval = client.config().poll_interval();
        assert_eq!(started.elapsed(), interval * (DELETE_CONFIRMATION_ATTEMPTS - 1));
        assert!(matches!(
            err,
            ReconcileError::NotDeleted {
                attempts: DELETE_CONFIRMATION_ATTEMPTS,
                ..
            }
        ));
        assert_eq!(fake.count(Method::Get), 1 + DELETE_CONFIRMATION_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn delete_all_collects_failures() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            Method::Get,
            BASE,
            200,
            json!({ "notificationChannels": [remote("1"), remote("2"), remote("3")] }),
        );
        for name in ["1", "2", "3"] {
            let url = format!("{BASE}/{name}");
            fake.respond(Method::Get, &url, 200, remote(name));
            fake.respond(Method::Get, &url, 404, json!({}));
        }
        fake.respond(Method::Delete, &format!("{BASE}/1"), 200, json!({}));
        fake.respond(
            Method::Delete,
            &format!("{BASE}/2"),
            403,
            json!({ "error": { "message": "permission denied" } }),
        );
        let client = Client::new(fast_config(), fake.clone());
        let parent = Resource::new(&SCHEMA).with("project", Value::string("my-project"));

        let err = delete_all(
            &client,
            &parent,
            |r| r.str("name") != Some("3"),
            &CancelSignal::never(),
        )
        .await
        .unwrap_err();

        let ReconcileError::Multiple(errors) = err else {
            panic!("expected collected errors");
        };
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("permission denied"));
        assert_eq!(fake.count(Method::Delete), 2);
    }
}
