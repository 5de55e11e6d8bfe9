//! Resolves a `--release-name`/`--release-id` selector to the pair the
//! inventory engine needs, by scanning for the inventory Secret (its name
//! alone does not determine the other half of the pair).

use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams};
use model::{labels, Error};
use uuid::Uuid;

use crate::args::ReleaseSelector;

pub async fn resolve(client: &kube::Client, namespace: &str, selector: &ReleaseSelector) -> anyhow::Result<(String, Uuid)> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);

    let (label_key, label_value) = match selector {
        ReleaseSelector::Name(name) => (labels::RELEASE_NAME_KEY, name.clone()),
        ReleaseSelector::Id(id) => (labels::RELEASE_UUID_KEY, id.to_string()),
    };

    let lp = ListParams::default().labels(&format!(
        "{}={},{}={}",
        labels::COMPONENT_KEY,
        labels::COMPONENT_INVENTORY_VALUE,
        label_key,
        label_value
    ));
    let list = api.list(&lp).await?;
    let secret = list.items.into_iter().next().ok_or_else(|| Error::NotFound(format!("release matching {label_key}={label_value}")))?;

    let secret_labels = secret.metadata.labels.unwrap_or_default();
    let release_name = secret_labels.get(labels::RELEASE_NAME_KEY).cloned().ok_or_else(|| Error::Other("inventory secret missing release name label".into()))?;
    let release_uuid_str =
        secret_labels.get(labels::RELEASE_UUID_KEY).ok_or_else(|| Error::Other("inventory secret missing release uuid label".into()))?;
    let release_uuid = Uuid::parse_str(release_uuid_str)?;

    Ok((release_name, release_uuid))
}
