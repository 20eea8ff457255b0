use halyard_core::Resource;
use halyard_transport::Method;
use serde_json::Value as Json;

use crate::cancel::CancelSignal;
use crate::client::Client;
use crate::error::ReconcileError;
use crate::fetch::adopt_identity;

/// Page size sentinel: let the server choose, `pageSize` is not sent.
pub const MAX_PAGE_SIZE: i32 = -1;

/// One page of a listing plus what is needed to fetch the next.
#[derive(Debug, Clone)]
pub struct ResourceList {
    items: Vec<Resource>,
    next_page_token: String,
    page_size: i32,
    parent: Resource,
}

impl ResourceList {
    pub fn items(&self) -> &[Resource] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Resource> {
        self.items
    }

    pub fn has_next(&self) -> bool {
        !self.next_page_token.is_empty()
    }

    /// Replace this page with the following one.
    pub async fn next(
        &mut self,
        client: &Client,
        cancel: &CancelSignal,
    ) -> Result<(), ReconcileError> {
        if !self.has_next() {
            return Err(ReconcileError::InvalidArgument(format!(
                "no further pages of {} under {}",
                self.parent.kind(),
                self.parent
            )));
        }
        let page = fetch_page(
            client,
            &self.parent,
            &self.next_page_token,
            self.page_size,
            cancel,
        )
        .await?;
        *self = page;
        Ok(())
    }
}

/// List every resource under `parent`, letting the server size pages.
///
/// `parent` is a resource of the listed type with its parent fields set,
/// e.g. just `project` for uptime checks.
pub async fn list(
    client: &Client,
    parent: &Resource,
    cancel: &CancelSignal,
) -> Result<ResourceList, ReconcileError> {
    list_with_page_size(client, parent, MAX_PAGE_SIZE, cancel).await
}

pub async fn list_with_page_size(
    client: &Client,
    parent: &Resource,
    page_size: i32,
    cancel: &CancelSignal,
) -> Result<ResourceList, ReconcileError> {
    fetch_page(client, parent, "", page_size, cancel).await
}

async fn fetch_page(
    client: &Client,
    parent: &Resource,
    page_token: &str,
    page_size: i32,
    cancel: &CancelSignal,
) -> Result<ResourceList, ReconcileError> {
    let schema = parent.schema();
    let mut request = client.request(Method::Get, schema.urls.list, parent)?;
    if !page_token.is_empty() {
        request = request.with_query("pageToken", page_token);
    }
    if page_size != MAX_PAGE_SIZE {
        request = request.with_query("pageSize", page_size.to_string());
    }

    let body = client
        .send_json(&request, cancel)
        .await
        .map_err(|e| ReconcileError::transport(format!("listing {}", schema.kind), e))?;

    let items = match body.get(schema.list_key) {
        Some(Json::Array(items)) => items
            .iter()
            .map(|item| {
                let mut r = Resource::from_response(schema, item).map_err(|source| {
                    ReconcileError::Decode {
                        kind: schema.kind,
                        source,
                    }
                })?;
                adopt_identity(&mut r, parent);
                Ok(r)
            })
            .collect::<Result<Vec<_>, ReconcileError>>()?,
        _ => Vec::new(),
    };
    let next_page_token = body
        .get("nextPageToken")
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string();

    tracing::debug!(
        kind = schema.kind,
        items = items.len(),
        more = !next_page_token.is_empty(),
        "listed page"
    );
    Ok(ResourceList {
        items,
        next_page_token,
        page_size,
        parent: parent.clone(),
    })
}

/// Whether a listed item is the same object as `target`.
pub fn matches(item: &Resource, target: &Resource) -> bool {
    match (item.identity(), target.identity()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
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
    use crate::resources::uptime_check_config::SCHEMA;

    const URL: &str = "https://monitoring.googleapis.com/v3/projects/my-project/uptimeCheckConfigs";

    fn parent() -> Resource {
        Resource::new(&SCHEMA).with("project", Value::string("my-project"))
    }

    fn check(name: &str) -> Json {
        json!({
            "name": format!("projects/my-project/uptimeCheckConfigs/{name}"),
            "displayName": name,
            "timeout": "10s",
        })
    }

    #[tokio::test]
    async fn pages_until_token_is_empty() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(
            Method::Get,
            URL,
            200,
            json!({ "uptimeCheckConfigs": [check("a"), check("b")], "nextPageToken": "p2" }),
        );
        fake.respond(Method::Get, URL, 200, json!({ "uptimeCheckConfigs": [check("c")] }));
        let client = Client::new(Config::default(), fake.clone());
        let cancel = CancelSignal::never();

        let mut page = list_with_page_size(&client, &parent(), 2, &cancel).await.unwrap();
        assert_eq!(page.items().len(), 2);
        assert_eq!(page.items()[0].str("name"), Some("a"));
        assert_eq!(page.items()[0].str("project"), Some("my-project"));
        assert_eq!(page.items()[0].str("period"), Some("60s"));
        assert!(page.has_next());

        page.next(&client, &cancel).await.unwrap();
        assert_eq!(page.items().len(), 1);
        assert!(!page.has_next());
        assert!(page.next(&client, &cancel).await.is_err());

        let requests = fake.requests();
        assert_eq!(requests[0].query_param("pageSize"), Some("2"));
        assert_eq!(requests[0].query_param("pageToken"), None);
        assert_eq!(requests[1].query_param("pageToken"), Some("p2"));
    }

    #[tokio::test]
    async fn max_page_size_is_not_sent() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::Get, URL, 200, json!({}));
        let client = Client::new(Config::default(), fake.clone());

        let page = list(&client, &parent(), &CancelSignal::never()).await.unwrap();
        assert!(page.items().is_empty());
        assert!(!page.has_next());
        assert_eq!(fake.requests()[0].query_param("pageSize"), None);
    }

    #[test]
    fn matches_by_short_identity() {
        let listed = parent().with("name", Value::string("homepage"));
        let target = parent().with(
            "name",
            Value::string("projects/my-project/uptimeCheckConfigs/homepage"),
        );
        assert!(matches(&listed, &target));
        assert!(!matches(&listed, &parent()));
    }
}
