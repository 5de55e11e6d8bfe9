//! Construction of the `#opmReleaseMeta` overlay fragment (spec §4.2, §9
//! "Overlay as AST, not text").
//!
//! The fragment is built directly as a [`Value`] tree rather than by
//! formatting a string and reparsing it, which is what keeps label keys
//! with special characters safely quoted and avoids injection through
//! release/namespace names that happen to look like syntax.

use std::collections::BTreeMap;

use crate::context::Context;
use crate::instance::SourceFile;
use crate::value::{Kind, Value};

pub const OVERLAY_DEFINITION_NAME: &str = "#opmReleaseMeta";
pub const OVERLAY_FILE_NAME: &str = "__opm_overlay.yaml";

pub struct OverlayInput<'a> {
    pub package_name: &'a str,
    pub release_name: &'a str,
    pub namespace: &'a str,
    pub fqn: &'a str,
    pub version: &'a str,
    pub identity: uuid::Uuid,
    pub labels: &'a BTreeMap<String, String>,
}

/// Builds the overlay as a `Value` (for in-process unification with the
/// already-built module value) and as a [`SourceFile`] (for injection
/// through the loader's overlay mechanism, so a fresh context can rebuild
/// the identical file from bytes per spec §5's re-parse requirement).
pub fn build_overlay(ctx: &Context, input: &OverlayInput<'_>) -> (Value, SourceFile) {
    let mut meta = BTreeMap::new();
    meta.insert("name".to_string(), Value::new(ctx, Kind::String(input.release_name.to_string())));
    meta.insert("namespace".to_string(), Value::new(ctx, Kind::String(input.namespace.to_string())));
    meta.insert("fqn".to_string(), Value::new(ctx, Kind::String(input.fqn.to_string())));
    meta.insert("version".to_string(), Value::new(ctx, Kind::String(input.version.to_string())));
    meta.insert("identity".to_string(), Value::new(ctx, Kind::String(input.identity.to_string())));

    let labels: BTreeMap<String, Value> = input
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), Value::new(ctx, Kind::String(v.clone()))))
        .collect();
    meta.insert("labels".to_string(), Value::new(ctx, Kind::Struct(labels)));

    let mut root = BTreeMap::new();
    root.insert("package".to_string(), Value::new(ctx, Kind::String(input.package_name.to_string())));
    root.insert(OVERLAY_DEFINITION_NAME.to_string(), Value::new(ctx, Kind::Struct(meta)));

    let value = Value::new(ctx, Kind::Struct(root));
    let yaml = serde_yaml::to_string(&value.to_json()).unwrap_or_default();
    let file = SourceFile::new(OVERLAY_FILE_NAME, yaml.into_bytes());
    (value, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_carries_release_identity_and_labels() {
        let ctx = Context::new();
        let labels = BTreeMap::from([("module.opmodel.dev/name".to_string(), "demo".to_string())]);
        let input = OverlayInput {
            package_name: "demo",
            release_name: "demo-release",
            namespace: "default",
            fqn: "demo",
            version: "1.0.0",
            identity: uuid::Uuid::nil(),
            labels: &labels,
        };
        let (value, file) = build_overlay(&ctx, &input);
        let meta = value.lookup_path(OVERLAY_DEFINITION_NAME).unwrap();
        assert_eq!(meta.lookup_path("name").unwrap().as_str(), Some("demo-release"));
        assert_eq!(meta.lookup_path("identity").unwrap().as_str(), Some(uuid::Uuid::nil().to_string()).as_deref());
        assert!(!file.bytes.is_empty());
    }
}
