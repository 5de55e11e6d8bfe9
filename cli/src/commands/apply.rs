//! `opm mod apply`: render, server-side apply, prune, record (spec §4.9
//! "Apply protocol").

use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use kube::core::GroupVersionKind;
use kube::{discovery, Resource as _};
use model::{Error, Resource, ResourceFailure};
use tokio_util::sync::CancellationToken;

use crate::args::RenderArgs;

const FIELD_MANAGER: &str = "open-platform-model";

pub struct Args {
    pub render: RenderArgs,
    pub dry_run: bool,
    pub create_namespace: bool,
    pub force: bool,
    pub prune_namespaces: bool,
}

impl TryFrom<&clap::ArgMatches> for Args {
    type Error = anyhow::Error;

    fn try_from(m: &clap::ArgMatches) -> Result<Self, Self::Error> {
        Ok(Self {
            render: RenderArgs::try_from(m)?,
            dry_run: m.get_flag("dry-run"),
            create_namespace: m.get_flag("create-namespace"),
            force: m.get_flag("force"),
            prune_namespaces: m.get_flag("prune-namespaces"),
        })
    }
}

#[tracing::instrument(skip(args, cancel))]
pub async fn run(args: Args, cancel: CancellationToken) -> anyhow::Result<()> {
    let client = crate::client::build(args.render.kubeconfig.as_deref(), args.render.context.as_deref()).await?;
    let rendered = crate::pipeline::run_render(&args.render, cancel.clone()).await?;
    let release = &rendered.release;

    if args.create_namespace && !args.dry_run {
        ensure_namespace(&client, &args.render.namespace).await?;
    }

    let loaded = inventory::load(&client, &args.render.namespace, &release.name, release.release_identity).await?;

    if rendered.resources.is_empty() && !loaded.inventory.is_empty() && !args.force {
        return Err(Error::EmptyRenderRequiresForce.into());
    }

    let mut stale = inventory::compute_stale(&loaded, &rendered.resources);
    if !args.prune_namespaces {
        stale.retain(|e| e.identity.kind != "Namespace");
    }
    model::order_entries_descending(&mut stale);

    if loaded.inventory.is_empty() {
        pre_apply_existence_check(&client, &rendered.resources).await?;
    }

    if args.dry_run {
        for resource in &rendered.resources {
            println!("---");
            print!("{}", serde_yaml::to_string(&resource.object)?);
        }
        tracing::info!(stale = stale.len(), "dry run: no changes applied");
        return Ok(());
    }

    let mut failures = Vec::new();
    for resource in &rendered.resources {
        if cancel.is_cancelled() {
            break;
        }
        if let Err(e) = apply_one(&client, resource).await {
            failures.push(ResourceFailure {
                group: resource.group(),
                kind: resource.kind(),
                namespace: resource.namespace(),
                name: resource.name(),
                message: e.to_string(),
            });
        }
    }

    let failure_count = failures.len();
    if let Some(err) = partial_apply_error(failures) {
        tracing::error!(count = failure_count, "apply failed for one or more resources; skipping prune and inventory write");
        return Err(err.into());
    }

    for entry in &stale {
        prune_one(&client, &args.render.namespace, entry).await?;
    }

    let timestamp = chrono_now();
    inventory::commit(
        &client,
        &args.render.namespace,
        &release.name,
        release.release_identity,
        loaded,
        rendered.module.clone(),
        rendered.values.clone(),
        &rendered.resources,
        rendered.manifest_digest.clone(),
        timestamp,
        None,
    )
    .await?;

    tracing::info!(
        resources = rendered.resources.len(),
        pruned = stale.len(),
        digest = %rendered.manifest_digest,
        "apply complete"
    );
    Ok(())
}

/// Partial-failure guard (spec §4.9 "Apply protocol" step 5: a failure
/// partway through apply skips prune and the inventory write entirely, so
/// the release's previously-recorded state is left untouched).
fn partial_apply_error(failures: Vec<ResourceFailure>) -> Option<Error> {
    if failures.is_empty() { None } else { Some(Error::PartialApply(failures)) }
}

async fn apply_one(client: &kube::Client, resource: &Resource) -> Result<(), kube::Error> {
    let gvk = gvk_of(resource);
    let (ar, _caps) = discovery::pinned_kind(client, &gvk).await?;
    let api: Api<DynamicObject> = match resource.namespace() {
        Some(ns) => Api::namespaced_with(client.clone(), &ns, &ar),
        None => Api::all_with(client.clone(), &ar),
    };
    let obj: DynamicObject = serde_json::from_value(resource.object.clone()).expect("rendered resource is valid JSON");
    api.patch(&resource.name(), &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&obj)).await?;
    Ok(())
}

async fn prune_one(client: &kube::Client, default_namespace: &str, entry: &model::InventoryEntry) -> anyhow::Result<()> {
    let gvk = GroupVersionKind { group: entry.identity.group.clone(), version: version_of(&entry.api_version), kind: entry.identity.kind.clone() };
    let (ar, _caps) = discovery::pinned_kind(client, &gvk).await?;
    let ns = entry.identity.namespace.clone().unwrap_or_else(|| default_namespace.to_string());
    let api: Api<DynamicObject> = if entry.identity.namespace.is_some() {
        Api::namespaced_with(client.clone(), &ns, &ar)
    } else {
        Api::all_with(client.clone(), &ar)
    };
    match api.delete(&entry.identity.name, &Default::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Pre-apply existence check for a first-time release: fails closed if a
/// rendered resource already exists untracked or terminating (spec §4.9
/// step 6).
async fn pre_apply_existence_check(client: &kube::Client, resources: &[Resource]) -> anyhow::Result<()> {
    for resource in resources {
        let gvk = gvk_of(resource);
        let (ar, _caps) = discovery::pinned_kind(client, &gvk).await?;
        let api: Api<DynamicObject> = match resource.namespace() {
            Some(ns) => Api::namespaced_with(client.clone(), &ns, &ar),
            None => Api::all_with(client.clone(), &ar),
        };
        match api.get(&resource.name()).await {
            Ok(existing) => {
                if existing.meta().deletion_timestamp.is_some() {
                    return Err(Error::Terminating(format!("{}/{}", resource.kind(), resource.name())).into());
                }
                let labels = existing.meta().labels.clone().unwrap_or_default();
                if !labels.contains_key(model::labels::RELEASE_UUID_KEY) {
                    return Err(Error::Untracked(format!("{}/{}", resource.kind(), resource.name())).into());
                }
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn ensure_namespace(client: &kube::Client, namespace: &str) -> anyhow::Result<()> {
    use k8s_openapi::api::core::v1::Namespace;
    let api: Api<Namespace> = Api::all(client.clone());
    match api.get(namespace).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            let ns = Namespace {
                metadata: kube::core::ObjectMeta { name: Some(namespace.to_string()), ..Default::default() },
                ..Default::default()
            };
            api.create(&PostParams::default(), &ns).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn gvk_of(resource: &Resource) -> GroupVersionKind {
    GroupVersionKind { group: resource.group(), version: version_of(&resource.api_version()), kind: resource.kind() }
}

fn version_of(api_version: &str) -> String {
    api_version.split_once('/').map(|(_, v)| v.to_string()).unwrap_or_else(|| api_version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_failures_allows_prune_and_commit_to_proceed() {
        assert!(partial_apply_error(Vec::new()).is_none());
    }

    #[test]
    fn any_failure_short_circuits_prune_and_commit() {
        let failures = vec![ResourceFailure {
            group: String::new(),
            kind: "ConfigMap".to_string(),
            namespace: Some("default".to_string()),
            name: "demo".to_string(),
            message: "connection refused".to_string(),
        }];
        match partial_apply_error(failures.clone()) {
            Some(Error::PartialApply(got)) => assert_eq!(got, failures),
            other => panic!("expected PartialApply, got {other:?}"),
        }
    }
}

fn chrono_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
