//! `opm mod delete`: inventory-first delete, label-scan fallback (spec
//! §4.9 "Delete").

use kube::api::{Api, DynamicObject, ListParams};
use kube::core::GroupVersionKind;
use kube::discovery;
use model::labels;

use crate::args::{ReleaseSelector, SelectorArgs};

pub struct Args {
    pub selector: SelectorArgs,
    pub ignore_not_found: bool,
}

impl TryFrom<&clap::ArgMatches> for Args {
    type Error = anyhow::Error;

    fn try_from(m: &clap::ArgMatches) -> Result<Self, Self::Error> {
        Ok(Self { selector: SelectorArgs::try_from(m)?, ignore_not_found: m.get_flag("ignore-not-found") })
    }
}

#[tracing::instrument(skip(args))]
pub async fn run(args: Args) -> anyhow::Result<()> {
    let client = crate::client::build(args.selector.kubeconfig.as_deref(), args.selector.context.as_deref()).await?;
    let namespace = &args.selector.namespace;

    let (release_name, release_uuid) = crate::selector::resolve(&client, namespace, &args.selector.selector).await?;

    let loaded = inventory::load(&client, namespace, &release_name, release_uuid).await?;
    let mut entries = loaded.inventory.latest_entries().to_vec();

    if entries.is_empty() {
        entries = label_scan(&client, namespace, release_uuid).await?;
    }

    if entries.is_empty() {
        if args.ignore_not_found {
            tracing::info!(release = %release_name, "nothing to delete");
            return Ok(());
        }
        return Err(model::Error::NotFound(format!("release {release_name}")).into());
    }

    let mut ordered = entries;
    model::order_entries_descending(&mut ordered);

    for entry in &ordered {
        delete_one(&client, namespace, entry).await?;
    }

    inventory::remove(&client, namespace, &release_name, release_uuid).await?;
    tracing::info!(release = %release_name, count = ordered.len(), "delete complete");
    Ok(())
}

async fn delete_one(client: &kube::Client, namespace: &str, entry: &model::InventoryEntry) -> anyhow::Result<()> {
    let gvk = GroupVersionKind {
        group: entry.identity.group.clone(),
        version: entry.api_version.split_once('/').map(|(_, v)| v.to_string()).unwrap_or_else(|| entry.api_version.clone()),
        kind: entry.identity.kind.clone(),
    };
    let (ar, _caps) = discovery::pinned_kind(client, &gvk).await?;
    let ns = entry.identity.namespace.clone().unwrap_or_else(|| namespace.to_string());
    let api: Api<DynamicObject> =
        if entry.identity.namespace.is_some() { Api::namespaced_with(client.clone(), &ns, &ar) } else { Api::all_with(client.clone(), &ar) };
    match api.delete(&entry.identity.name, &Default::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// No inventory available: discover every namespaced API resource kind
/// and list each with the release UUID label, since OPM has no
/// cluster-scoped ownership registry to consult instead (spec Non-goals;
/// spec §4.9 "Delete" still requires this fallback path to exist).
pub(crate) async fn label_scan(client: &kube::Client, namespace: &str, release_uuid: uuid::Uuid) -> anyhow::Result<Vec<model::InventoryEntry>> {
    let lp = ListParams::default().labels(&format!("{}={}", labels::RELEASE_UUID_KEY, release_uuid));
    let discovery = discovery::Discovery::new(client.clone()).run().await?;

    let mut entries = Vec::new();
    for group in discovery.groups() {
        for (ar, caps) in group.recommended_resources() {
            if !matches!(caps.scope, discovery::Scope::Namespaced) {
                continue;
            }
            let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, &ar);
            let Ok(list) = api.list(&lp).await else { continue };
            for obj in list.items {
                entries.push(model::InventoryEntry {
                    identity: model::InventoryEntryIdentity {
                        group: ar.group.clone(),
                        kind: ar.kind.clone(),
                        namespace: obj.metadata.namespace.clone(),
                        name: obj.metadata.name.clone().unwrap_or_default(),
                        component: String::new(),
                    },
                    api_version: ar.api_version.clone(),
                });
            }
        }
    }
    Ok(entries)
}
