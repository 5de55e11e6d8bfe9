//! A minimal stand-in for OPM's schema-language evaluator.
//!
//! The render pipeline is written against the [`Evaluator`] trait and the
//! [`Context`]/[`Value`] pair; nothing upstream assumes a particular
//! schema-language implementation. [`CueLikeEvaluator`] is the concrete,
//! YAML-backed implementation used everywhere in this workspace.

pub mod context;
pub mod error;
pub mod instance;
pub mod loader;
pub mod overlay;
pub mod schema;
pub mod value;

pub use context::{Context, ContextId};
pub use error::{EvalError, Position, Result};
pub use instance::{Instance, SourceFile};
pub use loader::{CueLikeEvaluator, Evaluator};
pub use overlay::{OverlayInput, build_overlay, OVERLAY_DEFINITION_NAME};
pub use schema::{Schema, StructSchema, Type};
pub use value::{Kind, Value};
