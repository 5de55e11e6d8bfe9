//! [`Release`]: a module bound to a name and namespace (spec §3).

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::component::Component;

/// Fixed namespace UUID release identity is derived from. Arbitrary but
/// must never change once releases have been created against it — doing
/// so would silently reassign every release's identity.
fn release_namespace() -> Uuid {
    Uuid::parse_str("6f6d6f64-656c-4f70-8d6f-64656c6f706d").expect("valid fixed UUID literal")
}

fn module_namespace() -> Uuid {
    Uuid::parse_str("6d6f6475-6c65-4f70-8d6f-64656c6f706d").expect("valid fixed UUID literal")
}

/// `releaseId(fqn, name, ns)` = UUID-v5 of the fixed namespace UUID over
/// the string `"fqn:name:ns"` (spec §8 "Release UUID purity"). Pure and
/// process-independent: same inputs always produce the same UUID.
pub fn release_id(fqn: &str, name: &str, namespace: &str) -> Uuid {
    Uuid::new_v5(&release_namespace(), format!("{fqn}:{name}:{namespace}").as_bytes())
}

/// Module identity: UUID-v5 over `fqn` and `version`, analogous to
/// [`release_id`] but scoped to the module definition rather than a
/// concrete release.
pub fn module_id(fqn: &str, version: &str) -> Uuid {
    Uuid::new_v5(&module_namespace(), format!("{fqn}:{version}").as_bytes())
}

#[derive(Debug, Clone)]
pub struct Release {
    pub name: String,
    pub namespace: String,
    pub module_identity: Uuid,
    pub release_identity: Uuid,
    pub labels: BTreeMap<String, String>,
    pub components: BTreeMap<String, Component>,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub name: String,
    pub namespace: String,
}
