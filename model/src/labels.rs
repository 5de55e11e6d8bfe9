//! Reserved label keys written onto every rendered resource and the
//! inventory Secret itself.

/// `app.kubernetes.io/managed-by: open-platform-model`
pub const MANAGED_BY_KEY: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "open-platform-model";

pub const MODULE_NAME_KEY: &str = "module.opmodel.dev/name";
pub const RELEASE_NAME_KEY: &str = "module-release.opmodel.dev/name";
pub const RELEASE_UUID_KEY: &str = "module-release.opmodel.dev/uuid";

/// Marks the inventory Secret so it is excluded from workload label queries.
pub const COMPONENT_KEY: &str = "opmodel.dev/component";
pub const COMPONENT_INVENTORY_VALUE: &str = "inventory";

pub const INVENTORY_SECRET_TYPE: &str = "opmodel.dev/release";
pub const INVENTORY_KIND: &str = "ModuleRelease";
pub const INVENTORY_API_VERSION: &str = "core.opmodel.dev/v1alpha1";

/// Secret name for a release's inventory: `opm.<releaseName>.<releaseUUID>`.
pub fn inventory_secret_name(release_name: &str, release_uuid: &uuid::Uuid) -> String {
    format!("opm.{release_name}.{release_uuid}")
}

/// The three release-scoped labels unified with module labels (spec §4.7 step 2).
pub fn release_labels(
    module_name: &str,
    release_name: &str,
    release_uuid: &uuid::Uuid,
) -> std::collections::BTreeMap<String, String> {
    let mut labels = std::collections::BTreeMap::new();
    labels.insert(MODULE_NAME_KEY.to_string(), module_name.to_string());
    labels.insert(RELEASE_NAME_KEY.to_string(), release_name.to_string());
    labels.insert(RELEASE_UUID_KEY.to_string(), release_uuid.to_string());
    labels
}
