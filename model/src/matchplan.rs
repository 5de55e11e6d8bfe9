//! [`MatchPlan`]: the output of the Matcher (spec §4.5).

use crate::fqn::Fqn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformerMatch {
    pub transformer_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct MatchPlan {
    /// Component name → ordered (by transformer name) list of matches.
    pub matches: std::collections::BTreeMap<String, Vec<TransformerMatch>>,
    pub unmatched_components: Vec<String>,
    pub unhandled_traits: Vec<Fqn>,
}

impl MatchPlan {
    pub fn matches_for(&self, component: &str) -> &[TransformerMatch] {
        self.matches.get(component).map(Vec::as_slice).unwrap_or(&[])
    }
}
