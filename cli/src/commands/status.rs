//! `opm mod status`: categorical per-resource health (SPEC_FULL.md §4.9
//! AMBIENT addition). `--watch` re-polls on an interval; this is not a
//! real watch stream, since controller-side reconciliation is out of
//! scope.

use kube::api::{Api, DynamicObject};
use kube::core::GroupVersionKind;
use kube::{discovery, Resource as _};

use crate::args::SelectorArgs;

pub struct Args {
    pub selector: SelectorArgs,
    pub watch: bool,
    pub interval_secs: u64,
}

impl TryFrom<&clap::ArgMatches> for Args {
    type Error = anyhow::Error;

    fn try_from(m: &clap::ArgMatches) -> Result<Self, Self::Error> {
        Ok(Self {
            selector: SelectorArgs::try_from(m)?,
            watch: m.get_flag("watch"),
            interval_secs: m.get_one::<String>("interval-secs").unwrap().parse()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Progressing,
    Healthy,
    Degraded,
    Unknown,
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Health::Progressing => "Progressing",
            Health::Healthy => "Healthy",
            Health::Degraded => "Degraded",
            Health::Unknown => "Unknown",
        })
    }
}

#[tracing::instrument(skip(args))]
pub async fn run(args: Args) -> anyhow::Result<()> {
    let client = crate::client::build(args.selector.kubeconfig.as_deref(), args.selector.context.as_deref()).await?;
    let namespace = args.selector.namespace.clone();
    let (release_name, release_uuid) = crate::selector::resolve(&client, &namespace, &args.selector.selector).await?;

    loop {
        let loaded = inventory::load(&client, &namespace, &release_name, release_uuid).await?;
        let entries = loaded.inventory.latest_entries();
        if entries.is_empty() {
            println!("release {release_name}: no tracked resources");
        } else {
            for entry in entries {
                let health = health_of(&client, &namespace, entry).await;
                println!(
                    "{health:<11} {}/{} {}/{}",
                    entry.identity.group,
                    entry.identity.kind,
                    entry.identity.namespace.clone().unwrap_or_default(),
                    entry.identity.name
                );
            }
        }

        if !args.watch {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_secs(args.interval_secs)).await;
    }
    Ok(())
}

async fn health_of(client: &kube::Client, default_namespace: &str, entry: &model::InventoryEntry) -> Health {
    let gvk = GroupVersionKind {
        group: entry.identity.group.clone(),
        version: entry.api_version.split_once('/').map(|(_, v)| v.to_string()).unwrap_or_else(|| entry.api_version.clone()),
        kind: entry.identity.kind.clone(),
    };
    let Ok((ar, _caps)) = discovery::pinned_kind(client, &gvk).await else { return Health::Unknown };
    let ns = entry.identity.namespace.clone().unwrap_or_else(|| default_namespace.to_string());
    let api: Api<DynamicObject> =
        if entry.identity.namespace.is_some() { Api::namespaced_with(client.clone(), &ns, &ar) } else { Api::all_with(client.clone(), &ar) };

    match api.get(&entry.identity.name).await {
        Ok(obj) => categorize(&obj),
        Err(kube::Error::Api(e)) if e.code == 404 => Health::Degraded,
        Err(_) => Health::Unknown,
    }
}

/// Reads `status.conditions[]` when present, preferring a `Ready` or
/// `Available` condition; falls back to existence-only reasoning.
fn categorize(obj: &DynamicObject) -> Health {
    let Some(conditions) = obj.data.pointer("/status/conditions").and_then(|v| v.as_array()) else {
        return if obj.meta().deletion_timestamp.is_some() { Health::Degraded } else { Health::Healthy };
    };

    let find = |kind: &str| conditions.iter().find(|c| c.get("type").and_then(|t| t.as_str()) == Some(kind));

    if let Some(c) = find("Ready").or_else(|| find("Available")) {
        return match c.get("status").and_then(|s| s.as_str()) {
            Some("True") => Health::Healthy,
            Some("False") => Health::Degraded,
            _ => Health::Progressing,
        };
    }
    if conditions.iter().any(|c| c.get("type").and_then(|t| t.as_str()) == Some("Progressing")) {
        return Health::Progressing;
    }
    Health::Unknown
}
