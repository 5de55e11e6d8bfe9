//! Release Builder (spec §4.3): turns a loaded module + options + optional
//! external values into a [`model::Release`] with validated components.

use std::collections::BTreeMap;
use std::path::Path;

use evaluator::{CueLikeEvaluator, Evaluator, Schema};
use model::{Component, Error, Fqn, Options, Release, ValidationError, ValidationErrors};
use tracing::instrument;

use crate::overlay::overlay_labels;
use crate::LoadedModule;

const CONFIG_DEFINITION: &str = "#config";
const COMPONENTS_DEFINITION: &str = "#components";
const VALUES_FIELD: &str = "values";

/// Builds a release. `values_files` are unified in order and, when
/// non-empty, fully override the module's own `values` (spec §4.3 step 2:
/// "external values fully override the module's default values, not
/// merged").
#[instrument(skip(evaluator, loaded, config_schema), fields(release = %options.name, namespace = %options.namespace))]
pub fn build_release(
    evaluator: &CueLikeEvaluator,
    loaded: &LoadedModule,
    options: &Options,
    values_files: &[&Path],
    config_schema: Option<&Schema>,
) -> Result<Release, Error> {
    let module_value = &loaded.module.value;

    let selected_values = select_values(evaluator, &loaded.ctx, module_value, values_files)?;

    if let Some(schema) = config_schema {
        validate_values(schema, &selected_values)?;
    }

    let mut injected = module_value.clone();
    evaluator
        .fill_path(&loaded.ctx, &mut injected, CONFIG_DEFINITION, selected_values.clone())
        .map_err(|e| Error::Validation(single_error(format!("failed to inject values into #config: {e}"))))?;

    if let Some(schema) = config_schema {
        let merged_config = injected
            .lookup_path(CONFIG_DEFINITION)
            .ok_or_else(|| Error::Validation(single_error(format!("module has no {CONFIG_DEFINITION} definition"))))?;
        validate_values(schema, merged_config)?;
    }

    let components = extract_components(&injected)?;

    let release_identity = model::release_id(
        loaded.module.metadata.fqn.as_deref().unwrap_or(&loaded.module.package_name),
        &options.name,
        &options.namespace,
    );
    let module_identity = model::module_id(
        loaded.module.metadata.fqn.as_deref().unwrap_or(&loaded.module.package_name),
        loaded.module.metadata.version.as_deref().unwrap_or("0.0.0"),
    );

    let labels = overlay_labels(&loaded.module);

    Ok(Release {
        name: options.name.clone(),
        namespace: options.namespace.clone(),
        module_identity,
        release_identity,
        labels,
        components,
    })
}

fn select_values(
    evaluator: &CueLikeEvaluator,
    ctx: &evaluator::Context,
    module_value: &evaluator::Value,
    values_files: &[&Path],
) -> Result<evaluator::Value, Error> {
    if values_files.is_empty() {
        return module_value
            .lookup_path(VALUES_FIELD)
            .cloned()
            .ok_or_else(|| Error::Validation(single_error("module declares no `values`".to_string())));
    }

    let mut unified: Option<evaluator::Value> = None;
    let mut errors = ValidationErrors::new();
    for path in values_files {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => return Err(Error::Load(format!("{}: {e}", path.display()))),
        };
        let name = path.display().to_string();
        let parsed = match evaluator.compile(ctx, &bytes, &name) {
            Ok(v) => v,
            Err(e) => {
                errors.push(ValidationError::new(format!("{name}: {e}")));
                continue;
            }
        };
        unified = Some(match unified {
            None => parsed,
            Some(acc) => match acc.clone().unify(ctx, &parsed, VALUES_FIELD) {
                Ok(merged) => merged,
                Err(e) => {
                    errors.push(ValidationError::new(format!("{name}: {e}")));
                    acc
                }
            },
        });
    }

    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    let unified = unified.expect("values_files is non-empty");
    Ok(unified.lookup_path(VALUES_FIELD).cloned().unwrap_or(unified))
}

fn validate_values(schema: &Schema, values: &evaluator::Value) -> Result<(), Error> {
    schema::validate(schema, values)
}

mod schema {
    use super::*;

    pub fn validate(schema: &Schema, values: &evaluator::Value) -> Result<(), Error> {
        match evaluator::schema::validate_against(schema, values, VALUES_FIELD) {
            Ok(()) => Ok(()),
            Err(errs) => {
                let mut collected = ValidationErrors::new();
                for e in errs {
                    collected.push(ValidationError::new(e.to_string()));
                }
                Err(Error::Validation(collected))
            }
        }
    }
}

fn single_error(message: String) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.push(ValidationError::new(message));
    errors
}

fn extract_components(release_value: &evaluator::Value) -> Result<BTreeMap<String, Component>, Error> {
    let components_def = release_value.lookup_path(COMPONENTS_DEFINITION).ok_or_else(|| {
        Error::Validation(single_error(format!("module has no {COMPONENTS_DEFINITION} definition")))
    })?;

    let mut out = BTreeMap::new();
    for (name, comp_value) in components_def.fields() {
        let labels = read_string_map(comp_value, "metadata.labels");
        let annotations = read_string_map(comp_value, "metadata.annotations");
        let resources = read_fqn_map(comp_value, "#resources");
        let traits = read_fqn_map(comp_value, "#traits");
        out.insert(
            name.to_string(),
            Component { name: name.to_string(), labels, annotations, resources, traits, value: comp_value.clone() },
        );
    }
    Ok(out)
}

fn read_string_map(value: &evaluator::Value, path: &str) -> BTreeMap<String, String> {
    value
        .lookup_path(path)
        .and_then(|v| v.as_struct())
        .map(|m| m.iter().filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string()))).collect())
        .unwrap_or_default()
}

fn read_fqn_map(value: &evaluator::Value, path: &str) -> BTreeMap<Fqn, evaluator::Value> {
    value
        .lookup_path(path)
        .and_then(|v| v.as_struct())
        .map(|m| m.iter().filter_map(|(k, v)| k.parse::<Fqn>().ok().map(|fqn| (fqn, v.clone()))).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // `#config` fields are declared `null` (unconstrained/"top", see
    // `Value::unify`'s doc comment): the concrete defaults live under
    // `values` and are unified in, the same way `executor::run_job` fills
    // `#config` from `values_json` at execution time.
    fn loaded_module(ctx: &evaluator::Context, values: serde_json::Value) -> LoadedModule {
        let module_value = evaluator::Value::from_json(
            ctx,
            &serde_json::json!({
                "metadata": {"name": "demo", "fqn": "demo", "version": "1.0.0"},
                "#config": {"replicas": null},
                "values": values,
                "#components": {"web": {}},
            }),
        );
        LoadedModule {
            module: model::Module {
                path: std::path::PathBuf::from("/demo"),
                package_name: "demo".to_string(),
                metadata: model::ModuleMetadata::default(),
                value: module_value,
            },
            instance: evaluator::Instance { root: std::path::PathBuf::from("/demo"), package_name: "demo".to_string(), files: Vec::new() },
            ctx: ctx.clone(),
        }
    }

    fn infer_schema(loaded: &LoadedModule) -> Schema {
        Schema::infer(loaded.module.value.lookup_path(CONFIG_DEFINITION).unwrap())
    }

    #[test]
    fn schema_validation_accepts_values_matching_config_shape() {
        let ctx = evaluator::Context::new();
        let loaded = loaded_module(&ctx, serde_json::json!({"replicas": 3}));
        let schema = infer_schema(&loaded);
        let evaluator = CueLikeEvaluator::new();
        let options = Options { name: "demo".to_string(), namespace: "default".to_string() };

        let release = build_release(&evaluator, &loaded, &options, &[], Some(&schema)).unwrap();
        assert!(release.components.contains_key("web"));
    }

    #[test]
    fn schema_validation_rejects_unknown_field_in_values() {
        let ctx = evaluator::Context::new();
        let loaded = loaded_module(&ctx, serde_json::json!({"replicas": 3, "bogus": true}));
        let schema = infer_schema(&loaded);
        let evaluator = CueLikeEvaluator::new();
        let options = Options { name: "demo".to_string(), namespace: "default".to_string() };

        let err = build_release(&evaluator, &loaded, &options, &[], Some(&schema)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn missing_config_definition_has_no_config_lookup() {
        let ctx = evaluator::Context::new();
        let module_value = evaluator::Value::from_json(
            &ctx,
            &serde_json::json!({"metadata": {"name": "demo"}, "values": {"replicas": 1}}),
        );
        assert!(module_value.lookup_path(CONFIG_DEFINITION).is_none());
    }
}
