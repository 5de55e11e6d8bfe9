//! [`Component`]: a named sub-unit declared within a module (spec §3).

use std::collections::BTreeMap;

use crate::fqn::Fqn;

pub const LIST_OUTPUT_ANNOTATION: &str = "list-output";

#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub resources: BTreeMap<Fqn, evaluator::Value>,
    pub traits: BTreeMap<Fqn, evaluator::Value>,
    pub value: evaluator::Value,
}

impl Component {
    /// Whether a matched transformer for this component produces a list
    /// of objects rather than a single object.
    pub fn is_list_output(&self) -> bool {
        self.annotations.get(LIST_OUTPUT_ANNOTATION).map(|v| v == "true").unwrap_or(false)
    }
}
