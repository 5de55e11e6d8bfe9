//! The render pipeline: Module Loader → Overlay Builder → Release Builder
//! → Provider Catalog → Matcher → Executor → Normalizer & Orderer.

pub mod digest;
pub mod executor;
pub mod loader;
pub mod matcher;
pub mod normalizer;
pub mod overlay;
pub mod provider;
pub mod release_builder;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use evaluator::CueLikeEvaluator;
use model::{Error, MatchPlan, ModuleRef, Options, Release, Resource, ValidationError, ValidationErrors};
use tokio_util::sync::CancellationToken;

/// A module together with the byte-level instance snapshot and the
/// single-threaded context that built `module.value`. Only ever used on
/// the main thread; the Executor re-parses its own copy per job instead
/// of reusing this handle (spec §5, §9).
pub struct LoadedModule {
    pub module: model::Module,
    pub instance: evaluator::Instance,
    pub ctx: evaluator::Context,
}

/// Full output of a render: the ordered resource set, the match plan (for
/// diagnostics/strict mode), and the manifest digest.
pub struct Rendered {
    pub resources: Vec<Resource>,
    pub plan: MatchPlan,
    pub manifest_digest: String,
    pub release: Release,
    pub module: ModuleRef,
    /// Serialized values used for this render, as persisted in the
    /// inventory's `change-sha1-<id>` entry (spec §6 "Persisted state").
    pub values: String,
}

pub struct RenderInputs<'a> {
    pub module_path: &'a Path,
    pub provider_path: &'a Path,
    pub options: &'a Options,
    pub values_files: &'a [&'a Path],
}

/// Runs the full render pipeline once: load, overlay, build release,
/// load the provider catalog, match, execute in parallel, normalize and
/// order. Does not touch the cluster or the inventory.
#[tracing::instrument(skip(inputs, cancel))]
pub async fn render(inputs: RenderInputs<'_>, cancel: CancellationToken) -> Result<Rendered, Error> {
    let evaluator = CueLikeEvaluator::new();

    let mut loaded = loader::load(&evaluator, inputs.module_path)?;
    let _identity = overlay::apply_overlay(&evaluator, &mut loaded, &inputs.options.name, &inputs.options.namespace)?;

    let config_value = loaded.module.value.lookup_path("#config").ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::new("module has no `#config` definition"));
        Error::Validation(errors)
    })?;
    let config_schema = evaluator::Schema::infer(config_value);

    let release = release_builder::build_release(&evaluator, &loaded, inputs.options, inputs.values_files, Some(&config_schema))?;

    let catalog_ctx = evaluator::Context::new();
    let catalog = provider::load_catalog(&evaluator, &catalog_ctx, inputs.provider_path)?;

    let plan = matcher::match_plan(&release, &catalog);

    let values_json = loaded
        .module
        .value
        .lookup_path("values")
        .map(|v| v.to_json())
        .unwrap_or(serde_json::Value::Null);
    let provider_bytes =
        std::fs::read(inputs.provider_path).map_err(|e| Error::Load(format!("{}: {e}", inputs.provider_path.display())))?;

    let values = serde_json::to_string(&values_json).unwrap_or_default();

    let executor_inputs = executor::ExecutorInputs {
        module_instance: Arc::new(loaded.instance.clone()),
        values_json: Arc::new(values_json),
        provider_bytes: Arc::new(provider_bytes),
        provider_name: Arc::new(inputs.provider_path.display().to_string()),
    };

    let raw_resources = executor::execute(executor_inputs, &release, &plan, cancel).await?;
    let resources = normalizer::normalize_and_order(raw_resources, &release);
    let manifest_digest = digest::manifest_digest(&resources);

    let module = ModuleRef {
        path: loaded.module.path.display().to_string(),
        version: loaded.module.metadata.version.clone().unwrap_or_default(),
        name: loaded.module.resolved_name().unwrap_or_default(),
    };

    Ok(Rendered { resources, plan, manifest_digest, release, module, values })
}

/// Absolute path of a module directory; used by CLI commands to resolve a
/// user-supplied relative path before handing it to [`loader::load`].
pub fn resolve_module_path(path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { std::env::current_dir().unwrap_or_default().join(path) }
}
