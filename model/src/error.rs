//! Shared error taxonomy for the render pipeline and release lifecycle.

use std::fmt;

/// A single validation failure, optionally located in source.
///
/// Two `ValidationError`s with the same `(position, path, message)` are
/// considered duplicates and collapsed by [`ValidationErrors::push`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationError {
    /// Human-readable message.
    pub message: String,
    /// CUE-style dotted path into the value tree, e.g. `values.replicas`.
    pub path: Option<String>,
    /// Source position, when the evaluator could attach one.
    pub position: Option<SourcePosition>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), path: None, position: None }
    }

    pub fn at_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self { message: message.into(), path: Some(path.into()), position: None }
    }

    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    fn dedup_key(&self) -> (Option<&SourcePosition>, Option<&str>, &str) {
        (self.position.as_ref(), self.path.as_deref(), self.message.as_str())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{path}: {}", self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(pos) = &self.position {
            write!(f, " ({pos})")?;
        }
        Ok(())
    }
}

/// File/line/column attached to a validation error by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourcePosition {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// An accumulated, deduplicated set of validation errors.
///
/// Built up across an entire values-validation walk (spec: "accumulate all
/// validation errors rather than stopping at the first").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: ValidationError) {
        if !self.0.iter().any(|e| e.dedup_key() == err.dedup_key()) {
            self.0.push(err);
        }
    }

    pub fn extend(&mut self, errs: impl IntoIterator<Item = ValidationError>) {
        for e in errs {
            self.push(e);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }

    /// Returns `Err(self)` if any errors were accumulated, else `Ok(())`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} validation error(s):", self.0.len())?;
        for e in &self.0 {
            writeln!(f, "  - {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Per-resource outcome of an apply, used to build the partial-failure
/// report required by the Apply/Diff/Delete engine.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceFailure {
    pub group: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    pub message: String,
}

impl fmt::Display for ResourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.namespace.as_deref().unwrap_or("-");
        write!(f, "{}/{} {}/{}: {}", self.group, self.kind, ns, self.name, self.message)
    }
}

/// Top-level error taxonomy, mirroring spec §7.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("load error: {0}")]
    Load(String),

    #[error("execute error: component {component:?} transformer {transformer:?}: {message}")]
    Execute { component: String, transformer: String, message: String },

    #[error("apply failed for {} resource(s); no changes were pruned or recorded", .0.len())]
    PartialApply(Vec<ResourceFailure>),

    #[error("inventory conflict: {0}")]
    InventoryConflict(String),

    #[error("inventory decode error: {0}")]
    InventoryDecode(String),

    #[error("{0} is terminating")]
    Terminating(String),

    #[error("{0} exists and is not tracked by a release")]
    Untracked(String),

    #[error("empty render with non-empty previous inventory; pass --force to proceed")]
    EmptyRenderRequiresForce,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("kubernetes client error: {0}")]
    Kube(#[from] kube::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
