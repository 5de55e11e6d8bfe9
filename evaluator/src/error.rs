use std::fmt;

/// Source position an evaluator error can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("{path}: not found")]
    NotFound { path: String },

    #[error("{path}: cannot unify {left} with {right}")]
    UnifyConflict { path: String, left: String, right: String },

    #[error("{path}: field {field:?} not allowed by closed struct")]
    ClosedStruct { path: String, field: String, position: Option<Position> },

    #[error("parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch { path: String, expected: String, found: String, position: Option<Position> },
}

impl EvalError {
    pub fn position(&self) -> Option<&Position> {
        match self {
            EvalError::ClosedStruct { position, .. } | EvalError::TypeMismatch { position, .. } => {
                position.as_ref()
            }
            _ => None,
        }
    }
}

pub type Result<T, E = EvalError> = std::result::Result<T, E>;
