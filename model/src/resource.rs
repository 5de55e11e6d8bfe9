//! [`Resource`]: a normalized, weighted Kubernetes object (spec §4.7).

use std::cmp::Ordering;

use crate::inventory::{InventoryEntry, InventoryEntryIdentity};

/// Fixed (group, kind) → weight table (spec §4.7 step 3).
///
/// Lower weight applies earlier; prune walks this in reverse.
fn weight_table(group: &str, kind: &str) -> i64 {
    match (group, kind) {
        ("apiextensions.k8s.io", "CustomResourceDefinition") => -100,
        ("", "Namespace") => -50,
        ("", "ResourceQuota" | "LimitRange") => -40,
        ("rbac.authorization.k8s.io", _) => -30,
        ("", "ServiceAccount") => -20,
        ("", "ConfigMap" | "Secret") => -10,
        ("", "PersistentVolumeClaim") => 0,
        ("apps", _) | ("batch", _) | ("", "Pod" | "Service") => 10,
        ("networking.k8s.io", _) | ("policy", _) => 20,
        ("autoscaling", _) => 30,
        _ => 1000,
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub object: serde_json::Value,
    pub weight: i64,
    pub component: String,
    pub transformer: String,
}

impl Resource {
    pub fn new(object: serde_json::Value, component: impl Into<String>, transformer: impl Into<String>) -> Self {
        let (group, kind) = api_version_and_kind(&object);
        let weight = weight_table(&group, &kind);
        Self { object, weight, component: component.into(), transformer: transformer.into() }
    }

    pub fn group(&self) -> String {
        api_version_and_kind(&self.object).0
    }

    pub fn kind(&self) -> String {
        api_version_and_kind(&self.object).1
    }

    pub fn api_version(&self) -> String {
        self.object.get("apiVersion").and_then(|v| v.as_str()).unwrap_or_default().to_string()
    }

    pub fn namespace(&self) -> Option<String> {
        self.object.pointer("/metadata/namespace").and_then(|v| v.as_str()).map(str::to_string)
    }

    pub fn name(&self) -> String {
        self.object.pointer("/metadata/name").and_then(|v| v.as_str()).unwrap_or_default().to_string()
    }

    /// Identity used for inventory set arithmetic: (group, kind,
    /// namespace, name, component).
    pub fn identity(&self) -> (String, String, Option<String>, String, String) {
        (self.group(), self.kind(), self.namespace(), self.name(), self.component.clone())
    }

    /// (weight asc, group, kind, namespace, name) — the canonical order
    /// (spec §4.7 step 4).
    pub fn order_key(&self) -> (i64, String, String, String, String) {
        (self.weight, self.group(), self.kind(), self.namespace().unwrap_or_default(), self.name())
    }
}

fn api_version_and_kind(object: &serde_json::Value) -> (String, String) {
    let kind = object.get("kind").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let api_version = object.get("apiVersion").and_then(|v| v.as_str()).unwrap_or_default();
    let group = api_version.split_once('/').map(|(g, _)| g).unwrap_or("").to_string();
    (group, kind)
}

/// Sorts `resources` by the canonical total order, ascending.
pub fn order_ascending(resources: &mut [Resource]) {
    resources.sort_by(|a, b| compare(a, b));
}

/// Sorts `resources` by the canonical total order, descending — the prune
/// order (reverse weight, `Namespace` last is handled by the caller
/// skipping namespaces from prune entirely).
pub fn order_descending(resources: &mut [Resource]) {
    resources.sort_by(|a, b| compare(b, a));
}

fn compare(a: &Resource, b: &Resource) -> Ordering {
    a.order_key().cmp(&b.order_key())
}

/// Throwaway `Resource` carrying just enough of an inventory entry's
/// identity to sort it by the canonical weight order.
fn stand_in(entry: &InventoryEntry) -> Resource {
    Resource::new(
        serde_json::json!({
            "kind": entry.identity.kind,
            "apiVersion": entry.api_version,
            "metadata": {"namespace": entry.identity.namespace, "name": entry.identity.name},
        }),
        entry.identity.component.clone(),
        "",
    )
}

fn entry_from_stand_in(resource: Resource) -> InventoryEntry {
    InventoryEntry {
        identity: InventoryEntryIdentity {
            group: resource.group(),
            kind: resource.kind(),
            namespace: resource.namespace(),
            name: resource.name(),
            component: resource.component.clone(),
        },
        api_version: resource.api_version(),
    }
}

/// Reorders inventory entries by the same canonical weight order used for
/// rendered resources, descending — the prune (spec §4.9 "Apply") and
/// delete (spec §4.9 "Delete") walk order.
pub fn order_entries_descending(entries: &mut Vec<InventoryEntry>) {
    let mut resources: Vec<Resource> = entries.iter().map(stand_in).collect();
    order_descending(&mut resources);
    *entries = resources.into_iter().map(entry_from_stand_in).collect();
}
