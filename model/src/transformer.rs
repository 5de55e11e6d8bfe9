//! [`Transformer`]: a named unit of the provider (spec §3, §4.4).

use std::collections::BTreeMap;

use crate::fqn::Fqn;

#[derive(Debug, Clone)]
pub struct Transformer {
    pub name: String,
    pub required_resources: Vec<Fqn>,
    pub required_traits: Vec<Fqn>,
    pub required_labels: BTreeMap<String, String>,
    /// Handle to the `#transform` sub-expression: `#component`, `#context`,
    /// `output` are filled in per job by the Executor.
    pub transform: evaluator::Value,
}
