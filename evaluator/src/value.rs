//! Concrete (post-unification) data values.
//!
//! `Value` stands in for the evaluator's runtime value tree. It is plain
//! structural data (no schema/closedness information — see [`crate::schema::Schema`]
//! for that), but every value is tagged with the [`ContextId`] of the
//! context that produced it so cross-context misuse can be caught.

use std::collections::BTreeMap;
use std::fmt;

use crate::context::{Context, ContextId};
use crate::error::{EvalError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

/// A value plus the context that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    ctx: ContextId,
    pub kind: Kind,
}

impl Value {
    pub fn new(ctx: &Context, kind: Kind) -> Self {
        Self { ctx: ctx.id(), kind }
    }

    pub fn null(ctx: &Context) -> Self {
        Self::new(ctx, Kind::Null)
    }

    pub fn struct_(ctx: &Context, fields: BTreeMap<String, Value>) -> Self {
        Self::new(ctx, Kind::Struct(fields))
    }

    /// Builds a new value stamped with `self`'s own context id, without
    /// requiring a `&Context` handle. Used when recursively rebuilding a
    /// tree (e.g. output-token substitution) where only a borrowed `Value`
    /// is in scope.
    pub fn retag(&self, kind: Kind) -> Value {
        Value { ctx: self.ctx, kind }
    }

    pub fn context_id(&self) -> ContextId {
        self.ctx
    }

    /// Converts a plain `serde_json::Value` tree into evaluator `Value`s
    /// owned by `ctx`. Used by the loader to turn parsed module/provider
    /// documents into evaluator state.
    pub fn from_json(ctx: &Context, json: &serde_json::Value) -> Self {
        let kind = match json {
            serde_json::Value::Null => Kind::Null,
            serde_json::Value::Bool(b) => Kind::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Kind::Int(i)
                } else {
                    Kind::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Kind::String(s.clone()),
            serde_json::Value::Array(a) => {
                Kind::List(a.iter().map(|v| Value::from_json(ctx, v)).collect())
            }
            serde_json::Value::Object(o) => Kind::Struct(
                o.iter().map(|(k, v)| (k.clone(), Value::from_json(ctx, v))).collect(),
            ),
        };
        Self::new(ctx, kind)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match &self.kind {
            Kind::Null => serde_json::Value::Null,
            Kind::Bool(b) => serde_json::Value::Bool(*b),
            Kind::Int(i) => serde_json::Value::Number((*i).into()),
            Kind::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Kind::String(s) => serde_json::Value::String(s.clone()),
            Kind::List(l) => serde_json::Value::Array(l.iter().map(Value::to_json).collect()),
            Kind::Struct(m) => {
                serde_json::Value::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match &self.kind {
            Kind::Struct(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            Kind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.kind {
            Kind::List(l) => Some(l),
            _ => None,
        }
    }

    /// Enumerates the fields of a struct value in declaration (sorted) order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.as_struct().into_iter().flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Looks up a dotted path, e.g. `values.replicas`.
    pub fn lookup_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = current.as_struct()?.get(segment)?;
        }
        Some(current)
    }

    /// Injects `value` at `path`, creating intermediate struct nodes.
    ///
    /// Panics if `value` was built in a different context than `self`
    /// (spec §8 scenario 5: cross-context `FillPath` is a correctness
    /// guardrail, not a recoverable error).
    #[track_caller]
    pub fn fill_path(&mut self, ctx: &Context, path: &str, value: Value) -> Result<()> {
        ctx.assert_owns(self.ctx);
        ctx.assert_owns(value.ctx);
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        Self::fill_segments(self, ctx, &segments, value, path)
    }

    fn fill_segments(node: &mut Value, ctx: &Context, segments: &[&str], value: Value, full_path: &str) -> Result<()> {
        match segments.split_first() {
            None => {
                *node = node.clone().unify(ctx, &value, full_path)?;
                Ok(())
            }
            Some((head, rest)) => {
                if !matches!(node.kind, Kind::Struct(_)) {
                    node.kind = Kind::Struct(BTreeMap::new());
                }
                let Kind::Struct(map) = &mut node.kind else { unreachable!() };
                let child = map.entry((*head).to_string()).or_insert_with(|| Value::null(ctx));
                Self::fill_segments(child, ctx, rest, value, full_path)
            }
        }
    }

    /// Structural unification: scalars must agree exactly; structs merge
    /// field-by-field; a concrete value unified with `null` yields the
    /// concrete value (null models an unconstrained/"top" field).
    pub fn unify(self, ctx: &Context, other: &Value, path: &str) -> Result<Value> {
        ctx.assert_owns(self.ctx);
        ctx.assert_owns(other.ctx);
        let kind = match (&self.kind, &other.kind) {
            (Kind::Null, k) | (k, Kind::Null) => k.clone(),
            (Kind::Struct(a), Kind::Struct(b)) => {
                let mut merged = a.clone();
                for (k, v) in b {
                    match merged.remove(k) {
                        Some(existing) => {
                            let child_path = format!("{path}.{k}");
                            merged.insert(k.clone(), existing.unify(ctx, v, &child_path)?);
                        }
                        None => {
                            merged.insert(k.clone(), v.clone());
                        }
                    }
                }
                Kind::Struct(merged)
            }
            (a, b) if a == b => a.clone(),
            (a, b) => {
                return Err(EvalError::UnifyConflict {
                    path: path.to_string(),
                    left: describe(a),
                    right: describe(b),
                });
            }
        };
        Ok(Value::new(ctx, kind))
    }
}

fn describe(kind: &Kind) -> String {
    match kind {
        Kind::Null => "null".into(),
        Kind::Bool(b) => b.to_string(),
        Kind::Int(i) => i.to_string(),
        Kind::Float(f) => f.to_string(),
        Kind::String(s) => format!("{s:?}"),
        Kind::List(_) => "list".into(),
        Kind::Struct(_) => "struct".into(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unify_merges_disjoint_struct_fields() {
        let ctx = Context::new();
        let a = Value::from_json(&ctx, &serde_json::json!({"a": 1}));
        let b = Value::from_json(&ctx, &serde_json::json!({"b": 2}));
        let merged = a.unify(&ctx, &b, "$").unwrap();
        assert_eq!(merged.to_json(), serde_json::json!({"a": 1, "b": 2}));
    }

    #[test]
    fn unify_conflicting_scalars_errors() {
        let ctx = Context::new();
        let a = Value::from_json(&ctx, &serde_json::json!(1));
        let b = Value::from_json(&ctx, &serde_json::json!(2));
        assert!(a.unify(&ctx, &b, "$").is_err());
    }

    #[test]
    fn fill_path_creates_intermediate_structs() {
        let ctx = Context::new();
        let mut root = Value::null(&ctx);
        let leaf = Value::from_json(&ctx, &serde_json::json!(5));
        root.fill_path(&ctx, "values.replicas", leaf).unwrap();
        assert_eq!(root.lookup_path("values.replicas").unwrap().to_json(), serde_json::json!(5));
    }

    #[test]
    #[should_panic(expected = "cross-context use")]
    fn fill_path_panics_across_contexts() {
        let ctx_a = Context::new();
        let ctx_b = Context::new();
        let mut root = Value::null(&ctx_a);
        let leaf = Value::from_json(&ctx_b, &serde_json::json!(5));
        let _ = root.fill_path(&ctx_a, "x", leaf);
    }
}
