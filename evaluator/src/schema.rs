//! Schema nodes: the typed shape a [`crate::Value`] must conform to.
//!
//! Distinct from `Value` because closedness and type constraints are
//! properties of the *schema*, not of concrete data — the same struct
//! shape can be open in one context and closed in another.

use std::collections::BTreeMap;

use crate::error::{EvalError, Result};
use crate::value::{Kind, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Null,
    Bool,
    Int,
    Float,
    String,
    /// A secret field: typed `Secret`, not `string` (design note: "sensitive
    /// values are a type at the schema level").
    Secret,
    List(Box<Schema>),
    Struct(StructSchema),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructSchema {
    pub fields: BTreeMap<String, Schema>,
    /// `None` fields are optional and fall back to `default`.
    pub required: std::collections::BTreeSet<String>,
    /// Closed structs (the common case for `#config`/`#components`) reject
    /// any field not named in `fields`.
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub ty: Type,
    pub default: Option<Value>,
}

impl Schema {
    pub fn any() -> Self {
        Self { ty: Type::Any, default: None }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Derives a closed schema from a concrete `#config` value: each
    /// field's type is the kind of its default, and the default itself is
    /// carried through for later use (spec §4.3 step 3: "derive the
    /// configuration schema from the module's `#config` definition").
    /// `Kind::Null` models an unconstrained/"top" field (see
    /// [`Value::unify`]'s doc comment) and is inferred as `Type::Any`.
    pub fn infer(value: &Value) -> Self {
        let ty = match &value.kind {
            Kind::Null => Type::Any,
            Kind::Bool(_) => Type::Bool,
            Kind::Int(_) => Type::Int,
            Kind::Float(_) => Type::Float,
            Kind::String(_) => Type::String,
            Kind::List(items) => {
                Type::List(Box::new(items.first().map(Schema::infer).unwrap_or_else(Schema::any)))
            }
            Kind::Struct(fields) => Type::Struct(StructSchema {
                fields: fields.iter().map(|(k, v)| (k.clone(), Schema::infer(v))).collect(),
                required: Default::default(),
                closed: true,
            }),
        };
        Self { ty, default: Some(value.clone()) }
    }

    fn type_name(&self) -> &'static str {
        match &self.ty {
            Type::Any => "any",
            Type::Null => "null",
            Type::Bool => "bool",
            Type::Int => "int",
            Type::Float => "float",
            Type::String => "string",
            Type::Secret => "Secret",
            Type::List(_) => "list",
            Type::Struct(_) => "struct",
        }
    }

    /// Recursively walks `value` against this schema, accumulating every
    /// violation rather than stopping at the first (spec §4.3 step 3).
    pub fn validate(&self, value: &Value, path: &str, errors: &mut Vec<EvalError>) {
        match (&self.ty, &value.kind) {
            (Type::Any, _) => {}
            (Type::Null, Kind::Null) => {}
            (Type::Bool, Kind::Bool(_)) => {}
            (Type::Int, Kind::Int(_)) => {}
            (Type::Float, Kind::Float(_) | Kind::Int(_)) => {}
            (Type::String | Type::Secret, Kind::String(_)) => {}
            (Type::List(elem), Kind::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    elem.validate(item, &format!("{path}[{i}]"), errors);
                }
            }
            (Type::Struct(schema), Kind::Struct(fields)) => {
                self.validate_struct(schema, fields, path, errors);
            }
            _ => errors.push(EvalError::TypeMismatch {
                path: path.to_string(),
                expected: self.type_name().to_string(),
                found: describe_kind(&value.kind),
                position: None,
            }),
        }
    }

    fn validate_struct(
        &self,
        schema: &StructSchema,
        fields: &BTreeMap<String, Value>,
        path: &str,
        errors: &mut Vec<EvalError>,
    ) {
        for (name, value) in fields {
            let child_path = format!("{path}.{name}");
            match schema.fields.get(name) {
                Some(field_schema) => field_schema.validate(value, &child_path, errors),
                None if schema.closed => errors.push(EvalError::ClosedStruct {
                    path: path.to_string(),
                    field: name.clone(),
                    position: None,
                }),
                None => {}
            }
        }
        for required in &schema.required {
            if !fields.contains_key(required) {
                errors.push(EvalError::TypeMismatch {
                    path: format!("{path}.{required}"),
                    expected: "present".to_string(),
                    found: "missing".to_string(),
                    position: None,
                });
            }
        }
    }
}

fn describe_kind(kind: &Kind) -> String {
    match kind {
        Kind::Null => "null",
        Kind::Bool(_) => "bool",
        Kind::Int(_) => "int",
        Kind::Float(_) => "float",
        Kind::String(_) => "string",
        Kind::List(_) => "list",
        Kind::Struct(_) => "struct",
    }
    .to_string()
}

/// Convenience entry point used by the Release Builder: validates and
/// returns the accumulated errors, if any.
pub fn validate_against(schema: &Schema, value: &Value, root_path: &str) -> Result<(), Vec<EvalError>> {
    let mut errors = Vec::new();
    schema.validate(value, root_path, &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    #[test]
    fn closed_struct_rejects_unknown_field() {
        let ctx = Context::new();
        let schema = Schema {
            ty: Type::Struct(StructSchema {
                fields: BTreeMap::from([("replicas".to_string(), Schema { ty: Type::Int, default: None })]),
                required: Default::default(),
                closed: true,
            }),
            default: None,
        };
        let value = Value::from_json(&ctx, &serde_json::json!({"replicas": 1, "bogus": true}));
        let result = validate_against(&schema, &value, "values");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err()[0], EvalError::ClosedStruct { .. }));
    }

    #[test]
    fn open_struct_allows_unknown_field() {
        let ctx = Context::new();
        let schema = Schema {
            ty: Type::Struct(StructSchema { fields: BTreeMap::new(), required: Default::default(), closed: false }),
            default: None,
        };
        let value = Value::from_json(&ctx, &serde_json::json!({"whatever": 1}));
        assert!(validate_against(&schema, &value, "values").is_ok());
    }
}
