//! Inventory data model (spec §3, §4.8): the persisted state of a release.

use std::collections::BTreeMap;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InventoryMetadata {
    pub kind: String,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub name: String,
    pub namespace: String,
    #[serde(rename = "releaseId")]
    pub release_id: Uuid,
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: String,
}

impl InventoryMetadata {
    pub fn new(name: &str, namespace: &str, release_id: Uuid, last_transition_time: String) -> Self {
        Self {
            kind: crate::labels::INVENTORY_KIND.to_string(),
            api_version: crate::labels::INVENTORY_API_VERSION.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            release_id,
            last_transition_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModuleRef {
    pub path: String,
    pub version: String,
    pub name: String,
}

/// Identity of one inventory entry: (group, kind, namespace, name,
/// component) — what set arithmetic for the stale set operates over.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct InventoryEntryIdentity {
    pub group: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    pub component: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InventoryEntry {
    #[serde(flatten)]
    pub identity: InventoryEntryIdentity,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
}

impl InventoryEntryIdentity {
    /// Identity used for the rename-safety check: same resource, ignoring
    /// which component produced it (spec §4.9 step 5).
    pub fn resource_identity(&self) -> (&str, &str, &Option<String>, &str) {
        (&self.group, &self.kind, &self.namespace, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChangeEntry {
    pub module: ModuleRef,
    /// Native configuration-language string, as persisted (spec §6).
    pub values: String,
    #[serde(rename = "manifestDigest")]
    pub manifest_digest: String,
    pub timestamp: String,
    pub inventory: ChangeInventory,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ChangeInventory {
    pub entries: Vec<InventoryEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub metadata: Option<InventoryMetadata>,
    /// Change IDs, newest first.
    pub index: Vec<String>,
    pub changes: BTreeMap<String, ChangeEntry>,
}

impl Inventory {
    pub fn latest(&self) -> Option<(&str, &ChangeEntry)> {
        let id = self.index.first()?;
        self.changes.get(id.as_str()).map(|c| (id.as_str(), c))
    }

    pub fn latest_entries(&self) -> &[InventoryEntry] {
        self.latest().map(|(_, c)| c.inventory.entries.as_slice()).unwrap_or(&[])
    }

    /// Inserts/overwrites `change_id`, moves it to the front of the index,
    /// and trims the index+map to `max_history` (spec §3, §4.8: "identical
    /// inputs overwrite rather than append").
    pub fn record_change(&mut self, change_id: String, entry: ChangeEntry, max_history: usize) {
        self.index.retain(|id| id != &change_id);
        self.index.insert(0, change_id.clone());
        self.changes.insert(change_id, entry);
        while self.index.len() > max_history {
            if let Some(evicted) = self.index.pop() {
                self.changes.remove(&evicted);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_none() && self.index.is_empty()
    }
}
