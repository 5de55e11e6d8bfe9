//! Inventory Engine (spec §4.8): persists release state as a Kubernetes
//! Secret, keyed by `opm.<releaseName>.<releaseUUID>`, with optimistic
//! concurrency and a bounded change history.

pub mod client;
pub mod codec;
pub mod identity;

use kube::Client;
use model::{ChangeEntry, ChangeInventory, Error, InventoryEntry, InventoryEntryIdentity, InventoryMetadata, ModuleRef, Resource};
use uuid::Uuid;

pub use identity::{change_id, stale_set};
pub use model::Inventory;

const DEFAULT_MAX_HISTORY: usize = 10;

/// Current inventory for a release, plus the `resourceVersion` of the
/// backing Secret if one already exists (`None` means a fresh release).
pub struct Loaded {
    pub inventory: Inventory,
    pub secret_name: Option<String>,
    pub resource_version: Option<String>,
}

#[tracing::instrument(skip(client))]
pub async fn load(client: &Client, namespace: &str, release_name: &str, release_uuid: Uuid) -> Result<Loaded, Error> {
    match client::find(client, namespace, release_name, release_uuid).await? {
        Some(found) => {
            let inventory = codec::decode(&found.secret)?;
            Ok(Loaded {
                inventory,
                secret_name: found.secret.metadata.name.clone(),
                resource_version: found.secret.metadata.resource_version.clone(),
            })
        }
        None => Ok(Loaded { inventory: Inventory::default(), secret_name: None, resource_version: None }),
    }
}

fn entries_for(resources: &[Resource]) -> Vec<InventoryEntry> {
    resources
        .iter()
        .map(|r| InventoryEntry {
            identity: InventoryEntryIdentity {
                group: r.group(),
                kind: r.kind(),
                namespace: r.namespace(),
                name: r.name(),
                component: r.component.clone(),
            },
            api_version: r.api_version(),
        })
        .collect()
}

/// Computes the stale set (resources tracked by the release's latest
/// change but absent from `resources`, net of the component-rename
/// safety check) without mutating anything. Used by the apply engine
/// before it decides what to prune (spec §4.9 steps 4-5).
pub fn compute_stale(loaded: &Loaded, resources: &[Resource]) -> Vec<InventoryEntry> {
    let current = entries_for(resources);
    stale_set(loaded.inventory.latest_entries(), &current)
}

/// Records a successful apply: builds a change entry from the rendered
/// resource set, folds it into the inventory (overwriting on an identical
/// change ID, trimming history to `max_history`), and writes the Secret
/// back with optimistic concurrency. Only called after every resource in
/// `resources` has been applied and any stale resources pruned — a
/// partial failure must never reach this function (spec §4.9 "Apply").
#[tracing::instrument(skip(client, loaded, resources))]
pub async fn commit(
    client: &Client,
    namespace: &str,
    release_name: &str,
    release_uuid: Uuid,
    mut loaded: Loaded,
    module: ModuleRef,
    values: String,
    resources: &[Resource],
    manifest_digest: String,
    timestamp: String,
    max_history: Option<usize>,
) -> Result<Inventory, Error> {
    let id = change_id(&module.path, &module.version, &values, &manifest_digest);
    let entry = ChangeEntry {
        module,
        values,
        manifest_digest,
        timestamp: timestamp.clone(),
        inventory: ChangeInventory { entries: entries_for(resources) },
    };

    loaded.inventory.record_change(id, entry, max_history.unwrap_or(DEFAULT_MAX_HISTORY));
    loaded.inventory.metadata = Some(InventoryMetadata::new(release_name, namespace, release_uuid, timestamp));

    let secret = codec::encode(&loaded.inventory, release_name, namespace, release_uuid)?;

    match loaded.secret_name {
        Some(name) => {
            client::update(client, namespace, &name, secret, loaded.resource_version).await?;
        }
        None => {
            client::create(client, namespace, secret).await?;
        }
    }

    Ok(loaded.inventory)
}

/// Removes the inventory Secret for a release entirely (spec §4.9
/// "Delete"). A missing Secret is success.
#[tracing::instrument(skip(client))]
pub async fn remove(client: &Client, namespace: &str, release_name: &str, release_uuid: Uuid) -> Result<(), Error> {
    match client::find(client, namespace, release_name, release_uuid).await? {
        Some(found) => {
            let name = found.secret.metadata.name.ok_or_else(|| Error::Other("inventory secret missing a name".into()))?;
            client::delete(client, namespace, &name).await
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Resource as ModelResource;

    #[test]
    fn compute_stale_is_empty_for_fresh_release() {
        let loaded = Loaded { inventory: Inventory::default(), secret_name: None, resource_version: None };
        let resources = vec![ModelResource::new(serde_json::json!({"kind": "ConfigMap", "apiVersion": "v1", "metadata": {"name": "a"}}), "c", "t")];
        assert!(compute_stale(&loaded, &resources).is_empty());
    }
}
