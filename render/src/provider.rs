//! Provider Catalog (spec §4.4): evaluates a provider document into a flat,
//! read-only, freely-shareable dictionary of [`model::Transformer`]s.

use std::collections::BTreeMap;
use std::path::Path;

use evaluator::{CueLikeEvaluator, Evaluator};
use model::{Error, Fqn, Transformer};

const TRANSFORMERS_FIELD: &str = "transformers";
const REQUIRED_RESOURCES_FIELD: &str = "requiredResources";
const REQUIRED_TRAITS_FIELD: &str = "requiredTraits";
const REQUIRED_LABELS_FIELD: &str = "requiredLabels";
const TRANSFORM_FIELD: &str = "#transform";

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub transformers: BTreeMap<String, Transformer>,
}

pub fn load_catalog(evaluator: &CueLikeEvaluator, ctx: &evaluator::Context, path: &Path) -> Result<Catalog, Error> {
    let bytes = std::fs::read(path).map_err(|e| Error::Load(format!("{}: {e}", path.display())))?;
    let doc = evaluator
        .compile(ctx, &bytes, &path.display().to_string())
        .map_err(|e| Error::Load(format!("{}: {e}", path.display())))?;
    build_catalog(&doc)
}

fn build_catalog(doc: &evaluator::Value) -> Result<Catalog, Error> {
    let transformers_value = doc.lookup_path(TRANSFORMERS_FIELD).ok_or_else(|| {
        Error::Load(format!("provider document has no `{TRANSFORMERS_FIELD}` field"))
    })?;

    let mut transformers = BTreeMap::new();
    for (name, t) in transformers_value.fields() {
        let required_resources = read_fqn_list(t, REQUIRED_RESOURCES_FIELD);
        let required_traits = read_fqn_list(t, REQUIRED_TRAITS_FIELD);
        let required_labels = t
            .lookup_path(REQUIRED_LABELS_FIELD)
            .and_then(|v| v.as_struct())
            .map(|m| m.iter().filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string()))).collect())
            .unwrap_or_default();
        let transform = t.lookup_path(TRANSFORM_FIELD).cloned().ok_or_else(|| {
            Error::Load(format!("transformer {name:?} has no `{TRANSFORM_FIELD}`"))
        })?;

        transformers.insert(
            name.to_string(),
            Transformer { name: name.to_string(), required_resources, required_traits, required_labels, transform },
        );
    }
    Ok(Catalog { transformers })
}

fn read_fqn_list(value: &evaluator::Value, path: &str) -> Vec<Fqn> {
    value
        .lookup_path(path)
        .and_then(|v| v.as_list())
        .map(|l| l.iter().filter_map(|v| v.as_str().and_then(|s| s.parse::<Fqn>().ok())).collect())
        .unwrap_or_default()
}
