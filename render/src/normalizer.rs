//! Normalizer & Orderer (spec §4.7): map-to-list normalization, label
//! injection, weight assignment, and the canonical total order.

use model::{labels, Release, Resource};
use serde_json::Value as Json;

const NAMED_LIST_FIELDS: &[&str] = &["env", "ports", "volumeMounts"];
const CONTAINER_ARRAY_PATHS: &[&str] = &["/spec/containers", "/spec/initContainers"];
const TEMPLATE_CONTAINER_ARRAY_PATHS: &[&str] =
    &["/spec/template/spec/containers", "/spec/template/spec/initContainers"];
const VOLUMES_PATHS: &[&str] = &["/spec/volumes", "/spec/template/spec/volumes"];

/// Applies map→list normalization, injects release labels, recomputes
/// weight, and returns resources sorted by the canonical total order.
pub fn normalize_and_order(resources: Vec<Resource>, release: &Release) -> Vec<Resource> {
    let mut resources: Vec<Resource> = resources
        .into_iter()
        .map(|resource| {
            let mut object = resource.object;
            normalize_object(&mut object);
            inject_labels(&mut object, release);
            Resource::new(object, resource.component, resource.transformer)
        })
        .collect();
    model::order_ascending(&mut resources);
    resources
}

fn normalize_object(object: &mut Json) {
    for base in CONTAINER_ARRAY_PATHS.iter().chain(TEMPLATE_CONTAINER_ARRAY_PATHS) {
        if let Some(containers) = object.pointer_mut(base).and_then(Json::as_array_mut) {
            for container in containers {
                for field in NAMED_LIST_FIELDS {
                    normalize_named_map(container, field);
                }
            }
        }
    }
    for path in VOLUMES_PATHS {
        normalize_named_map_at_pointer(object, path);
    }
}

/// Converts `container[field]` from an OPM-style map (`{name: value}`) into
/// the Kubernetes list form (`[{name, ...value}]`), sorted alphabetically
/// by key for deterministic output. No-ops if already a list or absent.
fn normalize_named_map(container: &mut Json, field: &str) {
    let Some(map_obj) = container.get(field).and_then(Json::as_object).cloned() else { return };

    let mut keys: Vec<&String> = map_obj.keys().collect();
    keys.sort();

    let list: Vec<Json> = keys
        .into_iter()
        .map(|key| {
            let mut entry = match map_obj.get(key) {
                Some(Json::Object(m)) => m.clone(),
                Some(Json::Null) | None => serde_json::Map::new(),
                Some(scalar) => {
                    let mut m = serde_json::Map::new();
                    m.insert("value".to_string(), scalar.clone());
                    m
                }
            };
            entry.insert("name".to_string(), Json::String(key.clone()));
            Json::Object(entry)
        })
        .collect();

    if let Some(obj) = container.as_object_mut() {
        obj.insert(field.to_string(), Json::Array(list));
    }
}

/// As [`normalize_named_map`], but the map lives directly at `pointer`
/// (e.g. `/spec/volumes`) rather than nested under a field name.
fn normalize_named_map_at_pointer(object: &mut Json, pointer: &str) {
    let Some(map_obj) = object.pointer(pointer).and_then(Json::as_object).cloned() else { return };

    let mut keys: Vec<&String> = map_obj.keys().collect();
    keys.sort();

    let list: Vec<Json> = keys
        .into_iter()
        .map(|key| {
            let mut entry = match map_obj.get(key) {
                Some(Json::Object(m)) => m.clone(),
                _ => serde_json::Map::new(),
            };
            entry.insert("name".to_string(), Json::String(key.clone()));
            Json::Object(entry)
        })
        .collect();

    if let Some(slot) = object.pointer_mut(pointer) {
        *slot = Json::Array(list);
    }
}

fn inject_labels(object: &mut Json, release: &Release) {
    let mut merged = labels::release_labels(
        release
            .labels
            .get(labels::MODULE_NAME_KEY)
            .cloned()
            .unwrap_or_default()
            .as_str(),
        &release.name,
        &release.release_identity,
    );
    merged.extend(release.labels.clone());

    let obj = object.as_object_mut().expect("rendered resource must be a JSON object");
    let metadata = obj.entry("metadata").or_insert_with(|| Json::Object(serde_json::Map::new()));
    let metadata_obj = metadata.as_object_mut().expect("metadata must be an object");
    let labels_entry = metadata_obj.entry("labels").or_insert_with(|| Json::Object(serde_json::Map::new()));
    let labels_obj = labels_entry.as_object_mut().expect("labels must be an object");
    for (k, v) in merged {
        labels_obj.entry(k).or_insert(Json::String(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_env_map_to_sorted_list() {
        let mut container = serde_json::json!({"env": {"B": "2", "A": "1"}});
        normalize_named_map(&mut container, "env");
        assert_eq!(
            container["env"],
            serde_json::json!([{"name": "A", "value": "1"}, {"name": "B", "value": "2"}])
        );
    }

    #[test]
    fn leaves_existing_list_untouched() {
        let mut container = serde_json::json!({"env": [{"name": "Z", "value": "9"}]});
        normalize_named_map(&mut container, "env");
        assert_eq!(container["env"], serde_json::json!([{"name": "Z", "value": "9"}]));
    }
}
