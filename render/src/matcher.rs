//! Matcher (spec §4.5): decides, for each (component, transformer) pair,
//! whether the component satisfies the transformer's requirements.

use std::collections::BTreeSet;

use model::{Component, MatchPlan, Release, Transformer, TransformerMatch};
use tracing::instrument;

use crate::provider::Catalog;

#[instrument(skip(release, catalog))]
pub fn match_plan(release: &Release, catalog: &Catalog) -> MatchPlan {
    let mut plan = MatchPlan::default();
    let mut handled_traits: BTreeSet<model::Fqn> = BTreeSet::new();

    for (name, component) in &release.components {
        let mut matches = Vec::new();
        for transformer in catalog.transformers.values() {
            if satisfies(component, transformer) {
                for fqn in &transformer.required_traits {
                    handled_traits.insert(fqn.clone());
                }
                matches.push(TransformerMatch {
                    transformer_name: transformer.name.clone(),
                    reason: match_reason(component, transformer),
                });
            }
        }
        matches.sort_by(|a, b| a.transformer_name.cmp(&b.transformer_name));

        if matches.is_empty() {
            plan.unmatched_components.push(name.clone());
        }
        plan.matches.insert(name.clone(), matches);
    }

    let mut all_traits: BTreeSet<model::Fqn> = BTreeSet::new();
    for component in release.components.values() {
        all_traits.extend(component.traits.keys().cloned());
    }
    plan.unhandled_traits = all_traits.difference(&handled_traits).cloned().collect();

    plan
}

fn satisfies(component: &Component, transformer: &Transformer) -> bool {
    transformer.required_resources.iter().all(|fqn| component.resources.contains_key(fqn))
        && transformer.required_traits.iter().all(|fqn| component.traits.contains_key(fqn))
        && transformer
            .required_labels
            .iter()
            .all(|(k, v)| component.labels.get(k).is_some_and(|cv| cv == v))
}

fn match_reason(component: &Component, transformer: &Transformer) -> String {
    format!(
        "component {:?} satisfies transformer {:?}: {} required resource(s), {} required trait(s), {} required label(s)",
        component.name,
        transformer.name,
        transformer.required_resources.len(),
        transformer.required_traits.len(),
        transformer.required_labels.len(),
    )
}
