//! Overlay Builder (spec §4.2): synthesizes `#opmReleaseMeta` and injects
//! it as an additional file of the module's package.

use std::collections::BTreeMap;

use evaluator::{Evaluator, OverlayInput, OVERLAY_DEFINITION_NAME};
use model::{labels, Error, Module};
use uuid::Uuid;

use crate::LoadedModule;

/// Unifies the module value with the overlay fragment and appends the
/// overlay's serialized bytes to the instance snapshot, so later
/// reparse-from-bytes (the Executor's per-job strategy) sees it too.
pub fn apply_overlay(
    evaluator: &evaluator::CueLikeEvaluator,
    loaded: &mut LoadedModule,
    release_name: &str,
    namespace: &str,
) -> Result<Uuid, Error> {
    let fqn = loaded
        .module
        .metadata
        .fqn
        .clone()
        .unwrap_or_else(|| loaded.module.package_name.clone());
    let version = loaded.module.metadata.version.clone().unwrap_or_else(|| "0.0.0".to_string());
    let identity = model::release_id(&fqn, release_name, namespace);
    let module_name = loaded.module.resolved_name().unwrap_or_else(|| loaded.module.package_name.clone());

    let mut merged_labels: BTreeMap<String, String> = loaded.module.metadata.labels.clone();
    merged_labels.extend(labels::release_labels(&module_name, release_name, &identity));

    let input = OverlayInput {
        package_name: &loaded.module.package_name,
        release_name,
        namespace,
        fqn: &fqn,
        version: &version,
        identity,
        labels: &merged_labels,
    };

    let (overlay_value, overlay_file) = evaluator::build_overlay(&loaded.ctx, &input);
    let merged = evaluator
        .unify(&loaded.ctx, loaded.module.value.clone(), &overlay_value)
        .map_err(|e| Error::Load(format!("overlay unification failed: {e}")))?;

    loaded.module.value = merged;
    loaded.instance = loaded.instance.with_extra_file(overlay_file);

    Ok(identity)
}

/// Reads back the computed `#opmReleaseMeta.labels` from the merged value,
/// used by the Release Builder to build the final release labels (spec
/// §4.3 step 6).
pub fn overlay_labels(module: &Module) -> BTreeMap<String, String> {
    module
        .value
        .lookup_path(&format!("{OVERLAY_DEFINITION_NAME}.labels"))
        .and_then(|v| v.as_struct())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
