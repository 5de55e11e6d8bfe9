//! Manifest digest and change ID computation (spec §3, §4.8).

use model::Resource;
use sha2::{Digest, Sha256};

/// SHA-256 over the concatenated, alphabetically-key-ordered JSON
/// serialization of each resource, in the Orderer's total order.
///
/// Pure function of the rendered set: identical renders produce identical
/// bytes (spec §8 "Deterministic digest").
pub fn manifest_digest(resources: &[Resource]) -> String {
    let mut hasher = Sha256::new();
    for resource in resources {
        let canonical = canonicalize(&resource.object);
        hasher.update(canonical.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Serializes `value` with map keys in alphabetical order at every level.
fn canonicalize(value: &serde_json::Value) -> String {
    serde_json::to_string(&sort_keys(value)).unwrap_or_default()
}

fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, serde_json::Value> =
                map.iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect();
            serde_json::to_value(sorted).unwrap_or(serde_json::Value::Null)
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_regardless_of_key_insertion_order() {
        let a = Resource::new(serde_json::json!({"b": 1, "a": 2}), "c", "t");
        let b = Resource::new(serde_json::json!({"a": 2, "b": 1}), "c", "t");
        assert_eq!(manifest_digest(std::slice::from_ref(&a)), manifest_digest(std::slice::from_ref(&b)));
    }

    #[test]
    fn digest_changes_with_content() {
        let a = Resource::new(serde_json::json!({"a": 1}), "c", "t");
        let b = Resource::new(serde_json::json!({"a": 2}), "c", "t");
        assert_ne!(manifest_digest(&[a]), manifest_digest(&[b]));
    }
}
