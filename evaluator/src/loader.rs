//! The evaluator's abstract capabilities (spec §6 "Evaluator (abstract
//! collaborator)"), plus one concrete, minimal implementation.
//!
//! This is not a CUE-compatible language: it is a small JSON/YAML-backed
//! value system that supports exactly the operations the render pipeline
//! needs (load, build, compile, unify, fill-path, lookup, fields,
//! closedness, positioned errors), enough to drive the pipeline and its
//! tests without depending on an external schema-language crate.

use std::path::{Path, PathBuf};

use crate::context::Context;
use crate::error::{EvalError, Result};
use crate::instance::{Instance, SourceFile};
use crate::schema::Schema;
use crate::value::Value;

/// Capabilities the render pipeline requires of the schema-language
/// evaluator. Implementations own no mutable shared state beyond what is
/// passed in explicitly: every method that reads or writes a `Value` takes
/// the owning [`Context`] so misuse panics close to the call site.
pub trait Evaluator {
    /// Reads a directory's source files into an [`Instance`], extracting
    /// the package name. Parses syntax only; does not evaluate (no
    /// unification, no type-checking).
    fn load(&self, dir: &Path) -> Result<Instance, EvalError>;

    /// Builds a single `Value` from every file in the instance, unifying
    /// them together in file order.
    fn build(&self, ctx: &Context, instance: &Instance) -> Result<Value>;

    /// Compiles one standalone document's bytes into a `Value` (used for
    /// provider documents and the overlay fragment).
    fn compile(&self, ctx: &Context, bytes: &[u8], source_name: &str) -> Result<Value>;

    fn unify(&self, ctx: &Context, a: Value, b: &Value) -> Result<Value> {
        a.unify(ctx, b, "$")
    }

    fn fill_path(&self, ctx: &Context, root: &mut Value, path: &str, value: Value) -> Result<()> {
        root.fill_path(ctx, path, value)
    }

    fn lookup<'v>(&self, value: &'v Value, path: &str) -> Option<&'v Value> {
        value.lookup_path(path)
    }

    fn fields<'v>(&self, value: &'v Value) -> Vec<(&'v str, &'v Value)> {
        value.fields().collect()
    }

    fn validate(&self, schema: &Schema, value: &Value, root_path: &str) -> std::result::Result<(), Vec<EvalError>> {
        crate::schema::validate_against(schema, value, root_path)
    }
}

/// The package clause file's required top-level key.
const PACKAGE_KEY: &str = "package";

/// Minimal concrete [`Evaluator`]: documents are YAML (a superset of JSON),
/// parsed into [`Value`] trees via `serde_yaml` + `Value::from_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CueLikeEvaluator;

impl CueLikeEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn parse_document(&self, bytes: &[u8], source_name: &str) -> Result<serde_json::Value, EvalError> {
        let text = std::str::from_utf8(bytes).map_err(|e| EvalError::Parse {
            file: source_name.to_string(),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(text)
            .map_err(|e| EvalError::Parse { file: source_name.to_string(), message: e.to_string() })
    }
}

impl Evaluator for CueLikeEvaluator {
    fn load(&self, dir: &Path) -> Result<Instance, EvalError> {
        let mut files = Vec::new();
        let mut package_name = None;

        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| EvalError::Parse { file: dir.display().to_string(), message: e.to_string() })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("yaml" | "yml" | "json")))
            .collect();
        entries.sort();

        for path in entries {
            let bytes = std::fs::read(&path)
                .map_err(|e| EvalError::Parse { file: path.display().to_string(), message: e.to_string() })?;
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();

            if package_name.is_none() {
                if let Ok(doc) = self.parse_document(&bytes, &name) {
                    if let Some(pkg) = doc.get(PACKAGE_KEY).and_then(|v| v.as_str()) {
                        package_name = Some(pkg.to_string());
                    }
                }
            }
            files.push(SourceFile::new(name, bytes));
        }

        let package_name = package_name.ok_or_else(|| EvalError::Parse {
            file: dir.display().to_string(),
            message: "no file declares a `package` clause".to_string(),
        })?;

        Ok(Instance { root: dir.to_path_buf(), package_name, files })
    }

    fn build(&self, ctx: &Context, instance: &Instance) -> Result<Value> {
        let mut merged = Value::null(ctx);
        for file in &instance.files {
            let value = self.compile(ctx, &file.bytes, &file.name)?;
            merged = merged.unify(ctx, &value, "$")?;
        }
        Ok(merged)
    }

    fn compile(&self, ctx: &Context, bytes: &[u8], source_name: &str) -> Result<Value> {
        let doc = self.parse_document(bytes, source_name)?;
        Ok(Value::from_json(ctx, &doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_extracts_package_name_and_snapshots_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("module.yaml"), "package: demo\nmetadata:\n  name: demo\n").unwrap();
        let evaluator = CueLikeEvaluator::new();
        let instance = evaluator.load(dir.path()).unwrap();
        assert_eq!(instance.package_name, "demo");
        assert_eq!(instance.files.len(), 1);
    }

    #[test]
    fn load_fails_without_package_clause() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("module.yaml"), "metadata:\n  name: demo\n").unwrap();
        let evaluator = CueLikeEvaluator::new();
        assert!(evaluator.load(dir.path()).is_err());
    }

    #[test]
    fn build_unifies_all_files_in_instance() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("module.yaml"), "package: demo\nmetadata:\n  name: demo\n").unwrap();
        std::fs::write(dir.path().join("values.yaml"), "package: demo\nvalues:\n  replicas: 1\n").unwrap();
        let evaluator = CueLikeEvaluator::new();
        let instance = evaluator.load(dir.path()).unwrap();
        let ctx = Context::new();
        let value = evaluator.build(&ctx, &instance).unwrap();
        assert_eq!(value.lookup_path("metadata.name").unwrap().as_str(), Some("demo"));
        assert_eq!(value.lookup_path("values.replicas").unwrap().to_json(), serde_json::json!(1));
    }
}
