//! Executor (spec §4.6): runs one transformer invocation per
//! (component, transformer) match in parallel, each job fully isolated in
//! its own freshly built evaluator context.
//!
//! Sharing a pre-built module value or instance handle across jobs is
//! unsafe (spec §5, §9); every job re-parses the module and provider
//! documents from immutable byte snapshots captured once on the main
//! thread (the "format-and-reparse" strategy, the default the spec
//! requires).

use std::sync::Arc;

use evaluator::{CueLikeEvaluator, Evaluator, Instance};
use model::{Error, MatchPlan, Release, Resource};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

const CONFIG_DEFINITION: &str = "#config";
const COMPONENT_PLACEHOLDER: &str = "#component";
const CONTEXT_PLACEHOLDER: &str = "#context";
const OUTPUT_FIELD: &str = "output";
const COMPONENTS_DEFINITION: &str = "#components";

/// Immutable inputs every executor job needs, captured once on the main
/// thread and shared read-only (cheap to clone: `Arc`-wrapped byte
/// buffers, not evaluator state).
#[derive(Clone)]
pub struct ExecutorInputs {
    pub module_instance: Arc<Instance>,
    pub values_json: Arc<serde_json::Value>,
    pub provider_bytes: Arc<Vec<u8>>,
    pub provider_name: Arc<String>,
}

struct Job {
    component_name: String,
    transformer_name: String,
    list_output: bool,
}

#[instrument(skip(inputs, release, plan, cancel))]
pub async fn execute(
    inputs: ExecutorInputs,
    release: &Release,
    plan: &MatchPlan,
    cancel: CancellationToken,
) -> Result<Vec<Resource>, Error> {
    let jobs: Vec<Job> = release
        .components
        .values()
        .flat_map(|component| {
            plan.matches_for(&component.name).iter().map(move |m| Job {
                component_name: component.name.clone(),
                transformer_name: m.transformer_name.clone(),
                list_output: component.is_list_output(),
            })
        })
        .collect();

    let release_name = release.name.clone();
    let release_namespace = release.namespace.clone();
    let release_identity = release.release_identity;

    let mut set = JoinSet::new();
    for job in jobs {
        let inputs = inputs.clone();
        let cancel = cancel.clone();
        let release_name = release_name.clone();
        let release_namespace = release_namespace.clone();
        set.spawn_blocking(move || {
            if cancel.is_cancelled() {
                return Ok(Vec::new());
            }
            run_job(&inputs, &job, &release_name, &release_namespace, release_identity)
        });
    }

    let mut resources = Vec::new();
    while let Some(joined) = set.join_next().await {
        let outcome = joined.map_err(|e| Error::Execute {
            component: "<unknown>".to_string(),
            transformer: "<unknown>".to_string(),
            message: format!("task panicked: {e}"),
        })?;
        resources.extend(outcome?);
    }

    Ok(resources)
}

fn run_job(
    inputs: &ExecutorInputs,
    job: &Job,
    release_name: &str,
    release_namespace: &str,
    release_identity: uuid::Uuid,
) -> Result<Vec<Resource>, Error> {
    let evaluator = CueLikeEvaluator::new();
    let ctx = evaluator::Context::new();

    let execute_err = |message: String| Error::Execute {
        component: job.component_name.clone(),
        transformer: job.transformer_name.clone(),
        message,
    };

    let mut module_value = evaluator
        .build(&ctx, &inputs.module_instance)
        .map_err(|e| execute_err(format!("rebuild module: {e}")))?;

    let values_value = evaluator::Value::from_json(&ctx, &inputs.values_json);
    evaluator
        .fill_path(&ctx, &mut module_value, CONFIG_DEFINITION, values_value)
        .map_err(|e| execute_err(format!("fill #config: {e}")))?;

    let provider_value = evaluator
        .compile(&ctx, &inputs.provider_bytes, &inputs.provider_name)
        .map_err(|e| execute_err(format!("rebuild provider: {e}")))?;
    let transform = provider_value
        .lookup_path(&format!("transformers.{}.#transform", job.transformer_name))
        .cloned()
        .ok_or_else(|| execute_err("transformer has no #transform".to_string()))?;

    let component_value = module_value
        .lookup_path(&format!("{COMPONENTS_DEFINITION}.{}", job.component_name))
        .cloned()
        .ok_or_else(|| execute_err("component missing from rebuilt module".to_string()))?;

    let context_value = build_context_value(&ctx, release_name, release_namespace, release_identity, &job.component_name);

    let mut filled = transform;
    evaluator
        .fill_path(&ctx, &mut filled, COMPONENT_PLACEHOLDER, component_value.clone())
        .map_err(|e| execute_err(format!("fill #component: {e}")))?;
    evaluator
        .fill_path(&ctx, &mut filled, CONTEXT_PLACEHOLDER, context_value.clone())
        .map_err(|e| execute_err(format!("fill #context: {e}")))?;

    let output = filled.lookup_path(OUTPUT_FIELD).cloned().ok_or_else(|| execute_err("no output produced".to_string()))?;
    let resolved = resolve_output(&output, &component_value, &context_value);

    let objects = if job.list_output {
        resolved
            .as_list()
            .map(|items| items.to_vec())
            .ok_or_else(|| execute_err("list-output component did not produce a list".to_string()))?
    } else {
        vec![resolved]
    };

    Ok(objects
        .into_iter()
        .map(|v| Resource::new(v.to_json(), job.component_name.clone(), job.transformer_name.clone()))
        .collect())
}

fn build_context_value(
    ctx: &evaluator::Context,
    release_name: &str,
    release_namespace: &str,
    release_identity: uuid::Uuid,
    component_name: &str,
) -> evaluator::Value {
    evaluator::Value::from_json(
        ctx,
        &serde_json::json!({
            "release": { "name": release_name, "namespace": release_namespace, "uuid": release_identity.to_string() },
            "component": { "name": component_name },
        }),
    )
}

/// Substitutes `${component.<path>}` / `${context.<path>}` string tokens
/// in the transform's `output` with the referenced value. A minimal,
/// explicit stand-in for the schema language's native interpolation.
fn resolve_output(output: &evaluator::Value, component: &evaluator::Value, context: &evaluator::Value) -> evaluator::Value {
    match &output.kind {
        evaluator::Kind::String(s) => {
            if let Some(resolved) = resolve_token(s, component, context) {
                resolved
            } else {
                output.clone()
            }
        }
        evaluator::Kind::List(items) => {
            output.retag(evaluator::Kind::List(items.iter().map(|v| resolve_output(v, component, context)).collect()))
        }
        evaluator::Kind::Struct(fields) => output.retag(evaluator::Kind::Struct(
            fields.iter().map(|(k, v)| (k.clone(), resolve_output(v, component, context))).collect(),
        )),
        _ => output.clone(),
    }
}

fn resolve_token(token: &str, component: &evaluator::Value, context: &evaluator::Value) -> Option<evaluator::Value> {
    let inner = token.strip_prefix("${")?.strip_suffix('}')?;
    let (root, path) = inner.split_once('.')?;
    let base = match root {
        "component" => component,
        "context" => context,
        _ => return None,
    };
    base.lookup_path(path).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_token_reads_component_field() {
        let ctx = evaluator::Context::new();
        let component = evaluator::Value::from_json(&ctx, &serde_json::json!({"metadata": {"name": "web"}}));
        let context = evaluator::Value::from_json(&ctx, &serde_json::json!({}));
        let resolved = resolve_token("${component.metadata.name}", &component, &context).unwrap();
        assert_eq!(resolved.as_str(), Some("web"));
    }
}
