//! The [`Module`] value produced by the Module Loader (spec §4.1).

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Static metadata extracted from the module's AST without evaluation.
///
/// `name` and `default_namespace` stay empty when the corresponding
/// field is computed rather than a string literal; they are reconciled
/// later from the fully evaluated value (spec §4.1).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModuleMetadata {
    pub name: Option<String>,
    pub fqn: Option<String>,
    pub version: Option<String>,
    pub default_namespace: Option<String>,
    pub labels: BTreeMap<String, String>,
}

/// A loaded module: a resolved path, its package name, static metadata,
/// and the evaluator value after overlay injection.
#[derive(Debug, Clone)]
pub struct Module {
    pub path: PathBuf,
    pub package_name: String,
    pub metadata: ModuleMetadata,
    pub value: evaluator::Value,
}

impl Module {
    /// Reads `metadata.name`, falling back to the overlay's computed
    /// release metadata when the static field was left empty because it
    /// was a computed (non-literal) expression.
    pub fn resolved_name(&self) -> Option<String> {
        self.metadata
            .name
            .clone()
            .or_else(|| self.value.lookup_path("metadata.name").and_then(|v| v.as_str()).map(str::to_string))
    }

    pub fn resolved_default_namespace(&self) -> Option<String> {
        self.metadata.default_namespace.clone().or_else(|| {
            self.value.lookup_path("metadata.defaultNamespace").and_then(|v| v.as_str()).map(str::to_string)
        })
    }
}
