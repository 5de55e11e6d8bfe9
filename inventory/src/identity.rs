//! Change identity and stale-set computation (spec §4.8, §4.9 steps 4-5).

use std::collections::BTreeSet;

use model::InventoryEntryIdentity;
use sha1::{Digest, Sha1};

/// `changeID = SHA1(module.path || module.version || values || manifestDigest)`,
/// truncated to 8 hex chars.
pub fn change_id(module_path: &str, module_version: &str, values: &str, manifest_digest: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(module_path.as_bytes());
    hasher.update(module_version.as_bytes());
    hasher.update(values.as_bytes());
    hasher.update(manifest_digest.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

/// `previous \ current`, identity = (group, kind, namespace, name,
/// component), then drops any entry whose (group, kind, namespace, name)
/// still exists in `current` under a different component name (the
/// component-rename safety check).
pub fn stale_set(previous: &[InventoryEntry], current: &[InventoryEntry]) -> Vec<InventoryEntry> {
    let current_full: BTreeSet<&InventoryEntryIdentity> = current.iter().map(|e| &e.identity).collect();
    let current_resources: BTreeSet<_> = current.iter().map(|e| e.identity.resource_identity()).collect();

    previous
        .iter()
        .filter(|e| !current_full.contains(&e.identity))
        .filter(|e| !current_resources.contains(&e.identity.resource_identity()))
        .cloned()
        .collect()
}

pub use model::InventoryEntry;

#[cfg(test)]
mod tests {
    use super::*;
    use model::InventoryEntryIdentity;

    fn entry(kind: &str, name: &str, component: &str) -> InventoryEntry {
        InventoryEntry {
            identity: InventoryEntryIdentity {
                group: "apps".to_string(),
                kind: kind.to_string(),
                namespace: Some("default".to_string()),
                name: name.to_string(),
                component: component.to_string(),
            },
            api_version: "apps/v1".to_string(),
        }
    }

    #[test]
    fn change_id_is_deterministic_and_truncated() {
        let a = change_id("/m", "1.0.0", "{}", "deadbeef");
        let b = change_id("/m", "1.0.0", "{}", "deadbeef");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn component_rename_without_resource_rename_yields_empty_stale_set() {
        let previous = vec![entry("StatefulSet", "minecraft", "app")];
        let current = vec![entry("StatefulSet", "minecraft", "server")];
        assert!(stale_set(&previous, &current).is_empty());
    }

    #[test]
    fn renamed_resource_is_stale() {
        let previous = vec![entry("StatefulSet", "minecraft", "app")];
        let current = vec![entry("StatefulSet", "minecraft-server", "app")];
        let stale = stale_set(&previous, &current);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].identity.name, "minecraft");
    }

    #[test]
    fn unchanged_entry_is_not_stale() {
        let previous = vec![entry("StatefulSet", "minecraft", "app")];
        let current = vec![entry("StatefulSet", "minecraft", "app")];
        assert!(stale_set(&previous, &current).is_empty());
    }
}
