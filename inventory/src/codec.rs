//! Encode/decode between the Inventory Secret's wire format (spec §6
//! "Persisted state: Inventory Secret") and [`model::Inventory`].

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use model::{labels, ChangeEntry, Error, Inventory, InventoryMetadata};

const METADATA_KEY: &str = "metadata";
const INDEX_KEY: &str = "index";
const CHANGE_KEY_PREFIX: &str = "change-sha1-";

pub fn decode(secret: &Secret) -> Result<Inventory, Error> {
    let data = secret.data.clone().unwrap_or_default();

    let metadata = data
        .get(METADATA_KEY)
        .map(|v| serde_json::from_slice::<InventoryMetadata>(&v.0))
        .transpose()
        .map_err(|e| Error::InventoryDecode(format!("metadata: {e}")))?;

    let index: Vec<String> = data
        .get(INDEX_KEY)
        .map(|v| serde_json::from_slice::<Vec<String>>(&v.0))
        .transpose()
        .map_err(|e| Error::InventoryDecode(format!("index: {e}")))?
        .unwrap_or_default();

    let mut changes = BTreeMap::new();
    for (key, value) in &data {
        if let Some(id) = key.strip_prefix(CHANGE_KEY_PREFIX) {
            let entry: ChangeEntry = serde_json::from_slice(&value.0)
                .map_err(|e| Error::InventoryDecode(format!("{key}: {e}")))?;
            changes.insert(id.to_string(), entry);
        }
    }

    Ok(Inventory { metadata, index, changes })
}

pub fn encode(
    inventory: &Inventory,
    release_name: &str,
    namespace: &str,
    release_uuid: uuid::Uuid,
) -> Result<Secret, Error> {
    let mut data = BTreeMap::new();

    if let Some(metadata) = &inventory.metadata {
        data.insert(METADATA_KEY.to_string(), ByteString(serde_json::to_vec(metadata)?));
    }
    data.insert(INDEX_KEY.to_string(), ByteString(serde_json::to_vec(&inventory.index)?));
    for (id, change) in &inventory.changes {
        data.insert(format!("{CHANGE_KEY_PREFIX}{id}"), ByteString(serde_json::to_vec(change)?));
    }

    let name = labels::inventory_secret_name(release_name, &release_uuid);
    let module_name = inventory.latest().map(|(_, change)| change.module.name.clone()).unwrap_or_default();

    let mut secret_labels = BTreeMap::new();
    secret_labels.insert(labels::MANAGED_BY_KEY.to_string(), labels::MANAGED_BY_VALUE.to_string());
    secret_labels.insert(labels::MODULE_NAME_KEY.to_string(), module_name);
    secret_labels.insert(labels::RELEASE_NAME_KEY.to_string(), release_name.to_string());
    secret_labels.insert(labels::RELEASE_UUID_KEY.to_string(), release_uuid.to_string());
    secret_labels.insert(labels::COMPONENT_KEY.to_string(), labels::COMPONENT_INVENTORY_VALUE.to_string());

    Ok(Secret {
        metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            labels: Some(secret_labels),
            ..Default::default()
        },
        type_: Some(labels::INVENTORY_SECRET_TYPE.to_string()),
        data: Some(data),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{ChangeInventory, ModuleRef};

    #[test]
    fn round_trips_inventory_through_secret_encoding() {
        let mut inventory = Inventory {
            metadata: Some(InventoryMetadata::new("demo", "default", uuid::Uuid::nil(), "2026-01-01T00:00:00Z".to_string())),
            index: vec![],
            changes: BTreeMap::new(),
        };
        inventory.record_change(
            "abcd1234".to_string(),
            ChangeEntry {
                module: ModuleRef { path: "/tmp/demo".to_string(), version: "1.0.0".to_string(), name: "demo".to_string() },
                values: "{}".to_string(),
                manifest_digest: "deadbeef".to_string(),
                timestamp: "2026-01-01T00:00:00Z".to_string(),
                inventory: ChangeInventory::default(),
            },
            10,
        );

        let secret = encode(&inventory, "demo", "default", uuid::Uuid::nil()).unwrap();
        let decoded = decode(&secret).unwrap();
        assert_eq!(decoded.index, inventory.index);
        assert_eq!(decoded.changes, inventory.changes);
        assert_eq!(decoded.metadata, inventory.metadata);
    }
}
