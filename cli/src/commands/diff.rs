//! `opm mod diff`: render and projected-compare against the live cluster
//! (spec §4.9 "Diff").

use kube::api::{Api, DynamicObject};
use kube::core::GroupVersionKind;
use kube::discovery;
use model::Resource;
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;

use crate::args::RenderArgs;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    Unchanged,
    Modified,
    Added,
    Orphaned,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            State::Unchanged => "unchanged",
            State::Modified => "modified",
            State::Added => "added",
            State::Orphaned => "orphaned",
        })
    }
}

#[tracing::instrument(skip(args, cancel))]
pub async fn run(args: RenderArgs, cancel: CancellationToken) -> anyhow::Result<()> {
    let client = crate::client::build(args.kubeconfig.as_deref(), args.context.as_deref()).await?;
    let rendered = crate::pipeline::run_render(&args, cancel).await?;

    let mut rendered_keys = std::collections::BTreeSet::new();
    for resource in &rendered.resources {
        rendered_keys.insert((resource.group(), resource.kind(), resource.namespace(), resource.name()));
        let state = diff_one(&client, resource).await?;
        println!("{state} {}/{} {}/{}", resource.group(), resource.kind(), resource.namespace().unwrap_or_default(), resource.name());
    }

    let release_uuid = release_identity(&rendered);
    let loaded = inventory::load(&client, &args.namespace, &args.name, release_uuid).await?;
    let tracked = loaded.inventory.latest_entries().to_vec();

    // No inventory to consult (spec §4.9 "Diff": "otherwise by a label scan
    // on OPM labels"): fall back to discovering live resources by release
    // UUID label instead of silently reporting zero orphans.
    let orphan_candidates = if tracked.is_empty() {
        crate::commands::delete::label_scan(&client, &args.namespace, release_uuid).await?
    } else {
        tracked
    };

    for entry in &orphan_candidates {
        let key = (entry.identity.group.clone(), entry.identity.kind.clone(), entry.identity.namespace.clone(), entry.identity.name.clone());
        if !rendered_keys.contains(&key) {
            println!("{} {}/{} {}/{}", State::Orphaned, entry.identity.group, entry.identity.kind, entry.identity.namespace.clone().unwrap_or_default(), entry.identity.name);
        }
    }

    Ok(())
}

fn release_identity(rendered: &render::Rendered) -> uuid::Uuid {
    rendered.release.release_identity
}

async fn diff_one(client: &kube::Client, resource: &Resource) -> anyhow::Result<State> {
    let gvk = GroupVersionKind {
        group: resource.group(),
        version: resource.api_version().split_once('/').map(|(_, v)| v.to_string()).unwrap_or_else(|| resource.api_version()),
        kind: resource.kind(),
    };
    let (ar, _caps) = discovery::pinned_kind(client, &gvk).await?;
    let api: Api<DynamicObject> = match resource.namespace() {
        Some(ns) => Api::namespaced_with(client.clone(), &ns, &ar),
        None => Api::all_with(client.clone(), &ar),
    };

    match api.get(&resource.name()).await {
        Ok(live) => {
            let projected = project(&serde_json::to_value(&live).unwrap_or_default(), &resource.object);
            if projected == resource.object { Ok(State::Unchanged) } else { Ok(State::Modified) }
        }
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(State::Added),
        Err(e) => Err(e.into()),
    }
}

const SERVER_MANAGED_METADATA: &[&str] = &["managedFields", "uid", "resourceVersion", "creationTimestamp", "generation"];

/// Projection protocol (spec §4.9 "Diff"): strips server-managed metadata
/// and `status`, then keeps only the field paths present in `rendered`.
fn project(live: &Json, rendered: &Json) -> Json {
    let mut live = live.clone();
    if let Some(metadata) = live.pointer_mut("/metadata").and_then(Json::as_object_mut) {
        for key in SERVER_MANAGED_METADATA {
            metadata.remove(*key);
        }
    }
    if let Some(obj) = live.as_object_mut() {
        obj.remove("status");
    }
    project_onto(&live, rendered)
}

fn project_onto(live: &Json, shape: &Json) -> Json {
    match (live, shape) {
        (Json::Object(live_map), Json::Object(shape_map)) => {
            let mut out = serde_json::Map::new();
            for key in shape_map.keys() {
                if let Some(v) = live_map.get(key) {
                    let projected = project_onto(v, &shape_map[key]);
                    if !is_empty_map(&projected) {
                        out.insert(key.clone(), projected);
                    }
                }
            }
            Json::Object(out)
        }
        (Json::Array(live_list), Json::Array(shape_list)) => {
            if shape_list.iter().all(|v| v.get("name").and_then(Json::as_str).is_some()) {
                project_named_list(live_list, shape_list)
            } else {
                Json::Array(live_list.iter().zip(shape_list.iter()).map(|(l, s)| project_onto(l, s)).collect())
            }
        }
        _ => live.clone(),
    }
}

fn project_named_list(live_list: &[Json], shape_list: &[Json]) -> Json {
    let by_name: std::collections::HashMap<&str, &Json> =
        live_list.iter().filter_map(|v| v.get("name").and_then(Json::as_str).map(|n| (n, v))).collect();
    Json::Array(
        shape_list
            .iter()
            .filter_map(|shape_entry| {
                let name = shape_entry.get("name").and_then(Json::as_str)?;
                by_name.get(name).map(|live_entry| project_onto(live_entry, shape_entry))
            })
            .collect(),
    )
}

fn is_empty_map(v: &Json) -> bool {
    matches!(v, Json::Object(m) if m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_strips_server_managed_metadata_and_status() {
        let live = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "demo",
                "namespace": "default",
                "managedFields": [{"manager": "kubectl"}],
                "uid": "abc-123",
                "resourceVersion": "42",
                "creationTimestamp": "2024-01-01T00:00:00Z",
                "generation": 3,
                "labels": {"app": "demo"},
            },
            "status": {"phase": "Bound"},
            "data": {"key": "value"},
        });
        let rendered = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "demo", "namespace": "default", "labels": {"app": "demo"}},
            "data": {"key": "value"},
        });

        let projected = project(&live, &rendered);
        assert_eq!(projected, rendered);
    }

    #[test]
    fn project_drops_fields_absent_from_rendered_shape() {
        let live = json!({
            "metadata": {"name": "demo", "annotations": {"extra": "noise"}},
            "data": {"key": "value", "extraKey": "noise"},
        });
        let rendered = json!({"metadata": {"name": "demo"}, "data": {"key": "value"}});

        let projected = project(&live, &rendered);
        assert_eq!(projected, json!({"metadata": {"name": "demo"}, "data": {"key": "value"}}));
    }

    #[test]
    fn project_named_list_associates_by_name_not_index() {
        let live = json!({
            "spec": {
                "ports": [
                    {"name": "metrics", "port": 9090},
                    {"name": "http", "port": 8080},
                ],
            },
        });
        let rendered = json!({"spec": {"ports": [{"name": "http", "port": 8080}]}});

        let projected = project(&live, &rendered);
        assert_eq!(projected, json!({"spec": {"ports": [{"name": "http", "port": 8080}]}}));
    }

    #[test]
    fn project_drops_maps_emptied_by_filtering() {
        let live = json!({"metadata": {"name": "demo", "annotations": {"extra": "noise"}}});
        let rendered = json!({"metadata": {"name": "demo", "annotations": {}}});

        let projected = project(&live, &rendered);
        assert_eq!(projected, json!({"metadata": {"name": "demo"}}));
    }

    #[test]
    fn unchanged_projection_matches_rendered_object() {
        let resource = json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "demo"}, "data": {"k": "v"}});
        assert_eq!(project(&resource, &resource), resource);
    }
}
