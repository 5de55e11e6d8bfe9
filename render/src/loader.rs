//! Module Loader (spec §4.1): turns a filesystem path into a [`model::Module`]
//! without running the evaluator.

use std::collections::BTreeMap;
use std::path::Path;

use evaluator::{CueLikeEvaluator, Evaluator};
use model::{Error, Module, ModuleMetadata};
use tracing::{debug, instrument};

use crate::LoadedModule;

/// Subdirectory whose presence marks a directory as a module.
pub const MODULE_MANIFEST_DIR: &str = "opm.mod";

#[instrument(skip(evaluator), fields(path = %path.display()))]
pub fn load(evaluator: &CueLikeEvaluator, path: &Path) -> Result<LoadedModule, Error> {
    let abs_path = path
        .canonicalize()
        .map_err(|e| Error::Load(format!("{}: not found: {e}", path.display())))?;

    let manifest_dir = abs_path.join(MODULE_MANIFEST_DIR);
    if !manifest_dir.is_dir() {
        return Err(Error::Load(format!("{}: not a module (missing {MODULE_MANIFEST_DIR}/)", abs_path.display())));
    }
    debug!("found module manifest directory");

    let instance = evaluator
        .load(&abs_path)
        .map_err(|e| Error::Load(format!("{}: load error: {e}", abs_path.display())))?;
    debug!(package = %instance.package_name, files = instance.files.len(), "loaded module instance");

    let metadata = extract_static_metadata(&instance);

    let ctx = evaluator::Context::new();
    let value = evaluator
        .build(&ctx, &instance)
        .map_err(|e| Error::Load(format!("{}: load error: {e}", abs_path.display())))?;

    let module = Module { path: abs_path, package_name: instance.package_name.clone(), metadata, value };
    Ok(LoadedModule { module, instance, ctx })
}

/// Reads `metadata.{name,fqn,version,defaultNamespace,labels}` as string
/// literals straight from the parsed YAML documents, without invoking
/// unification. Fields that are not plain scalars are left empty and
/// reconciled later from the fully evaluated value.
fn extract_static_metadata(instance: &evaluator::Instance) -> ModuleMetadata {
    let mut metadata = ModuleMetadata::default();
    for file in &instance.files {
        let Ok(text) = std::str::from_utf8(&file.bytes) else { continue };
        let Ok(doc) = serde_yaml::from_str::<serde_json::Value>(text) else { continue };
        let Some(meta) = doc.get("metadata") else { continue };

        if metadata.name.is_none() {
            metadata.name = meta.get("name").and_then(|v| v.as_str()).map(str::to_string);
        }
        if metadata.fqn.is_none() {
            metadata.fqn = meta.get("fqn").and_then(|v| v.as_str()).map(str::to_string);
        }
        if metadata.version.is_none() {
            metadata.version = meta.get("version").and_then(|v| v.as_str()).map(str::to_string);
        }
        if metadata.default_namespace.is_none() {
            metadata.default_namespace =
                meta.get("defaultNamespace").and_then(|v| v.as_str()).map(str::to_string);
        }
        if metadata.labels.is_empty() {
            if let Some(labels) = meta.get("labels").and_then(|v| v.as_object()) {
                metadata.labels = labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect::<BTreeMap<_, _>>();
            }
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_module(dir: &Path) {
        std::fs::create_dir_all(dir.join(MODULE_MANIFEST_DIR)).unwrap();
        std::fs::write(
            dir.join("module.yaml"),
            "package: demo\nmetadata:\n  name: demo\n  fqn: demo\n  version: \"1.0.0\"\n  defaultNamespace: default\n",
        )
        .unwrap();
    }

    #[test]
    fn loads_module_with_manifest_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path());
        let evaluator = CueLikeEvaluator::new();
        let loaded = load(&evaluator, dir.path()).unwrap();
        assert_eq!(loaded.module.package_name, "demo");
        assert_eq!(loaded.module.metadata.name.as_deref(), Some("demo"));
        assert_eq!(loaded.module.metadata.default_namespace.as_deref(), Some("default"));
    }

    #[test]
    fn rejects_directory_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("module.yaml"), "package: demo\n").unwrap();
        let evaluator = CueLikeEvaluator::new();
        assert!(load(&evaluator, dir.path()).is_err());
    }

    #[test]
    fn rejects_missing_path() {
        let evaluator = CueLikeEvaluator::new();
        assert!(load(&evaluator, Path::new("/no/such/path")).is_err());
    }
}
