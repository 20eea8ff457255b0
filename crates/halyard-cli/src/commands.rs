use std::path::Path;

use eyre::WrapErr;
use halyard_core::Resource;
use halyard_reconciler::{ApplyOptions, CancelSignal, Client, Lifecycle};
use serde_json::Value as Json;

use crate::config::{self, CliConfig};
use crate::manifest;

/// Apply every resource in the manifest, in order, stopping at the first
/// failure. Prints the converged states as a JSON array.
pub async fn apply(
    client: &Client,
    file: &Path,
    lifecycle: Lifecycle,
    cancel: &CancelSignal,
) -> eyre::Result<()> {
    let desired = manifest::read(file, client.config().project.as_deref())?;
    let options = ApplyOptions::default().with_lifecycle(lifecycle);

    let mut states = Vec::with_capacity(desired.len());
    for resource in &desired {
        let state = halyard_reconciler::apply(client, resource, &options, cancel)
            .await
            .wrap_err_with(|| format!("failed to apply {resource}"))?;
        tracing::info!(resource = %state, "applied");
        states.push(state);
    }
    print_resources(&states)
}

pub async fn get(client: &Client, file: &Path, cancel: &CancelSignal) -> eyre::Result<()> {
    let targets = manifest::read(file, client.config().project.as_deref())?;
    let mut states = Vec::with_capacity(targets.len());
    for target in &targets {
        let state = halyard_reconciler::get(client, target, cancel)
            .await
            .wrap_err_with(|| format!("failed to read {target}"))?;
        states.push(state);
    }
    print_resources(&states)
}

/// Walk every page under the parent and print all items.
pub async fn list(
    client: &Client,
    kind: &str,
    project: Option<&str>,
    service: Option<&str>,
    page_size: Option<i32>,
    cancel: &CancelSignal,
) -> eyre::Result<()> {
    let parent = parent(client, kind, project, service)?;
    let mut page = match page_size {
        Some(size) => halyard_reconciler::list_with_page_size(client, &parent, size, cancel).await?,
        None => halyard_reconciler::list(client, &parent, cancel).await?,
    };

    let mut items: Vec<Resource> = page.items().to_vec();
    while page.has_next() {
        page.next(client, cancel).await?;
        items.extend_from_slice(page.items());
    }
    tracing::debug!(count = items.len(), kind, "listed");
    print_resources(&items)
}

pub async fn delete(client: &Client, file: &Path, cancel: &CancelSignal) -> eyre::Result<()> {
    let targets = manifest::read(file, client.config().project.as_deref())?;
    for target in &targets {
        halyard_reconciler::delete(client, target, cancel)
            .await
            .wrap_err_with(|| format!("failed to delete {target}"))?;
        tracing::info!(resource = %target, "deleted");
    }
    Ok(())
}

/// Delete every resource of `kind` under the parent whose name starts with
/// `prefix` (all of them when no prefix is given).
pub async fn delete_all(
    client: &Client,
    kind: &str,
    project: Option<&str>,
    service: Option<&str>,
    prefix: Option<&str>,
    cancel: &CancelSignal,
) -> eyre::Result<()> {
    let parent = parent(client, kind, project, service)?;
    let deleted = halyard_reconciler::delete_all(
        client,
        &parent,
        |item| match prefix {
            Some(prefix) => item.name().is_some_and(|name| name.starts_with(prefix)),
            None => true,
        },
        cancel,
    )
    .await?;
    tracing::info!(deleted, kind, "sweep finished");
    println!("{}", serde_json::json!({ "deleted": deleted }));
    Ok(())
}

pub fn config_init(path: &Path, force: bool) -> eyre::Result<()> {
    if path.exists() && !force {
        return Err(eyre::eyre!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        ));
    }
    config::save(path, &CliConfig::default())?;
    println!("{}", path.display());
    Ok(())
}

/// Print the effective configuration, with the access token masked.
pub fn config_show(config: &CliConfig) -> eyre::Result<()> {
    let mut json = serde_json::to_value(config)?;
    if let Some(token) = json.get_mut("access_token") {
        *token = Json::String("********".to_string());
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn parent(
    client: &Client,
    kind: &str,
    project: Option<&str>,
    service: Option<&str>,
) -> eyre::Result<Resource> {
    let schema = manifest::schema_for(kind)?;
    let project = project.or(client.config().project.as_deref());
    manifest::parent(schema, project, service)
}

fn print_resources(resources: &[Resource]) -> eyre::Result<()> {
    let json: Vec<Json> = resources
        .iter()
        .map(|r| {
            let mut json = r.to_json();
            if let Json::Object(map) = &mut json {
                map.insert("kind".to_string(), Json::String(r.kind().to_string()));
            }
            json
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
