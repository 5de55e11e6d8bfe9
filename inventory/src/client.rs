//! Inventory Secret lookup: direct GET by constructed name, falling back
//! to a label scan on `uuid=<releaseUUID>` (spec §4.8 "Identity & lookup").

use k8s_openapi::api::core::v1::Secret;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client};
use model::{labels, Error};
use uuid::Uuid;

/// Result of a successful lookup: the Secret plus the `resourceVersion`
/// needed for optimistic-concurrency updates.
pub struct Found {
    pub secret: Secret,
}

#[tracing::instrument(skip(client))]
pub async fn find(client: &Client, namespace: &str, release_name: &str, release_uuid: Uuid) -> Result<Option<Found>, Error> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let name = labels::inventory_secret_name(release_name, &release_uuid);

    match api.get(&name).await {
        Ok(secret) => return Ok(Some(Found { secret })),
        Err(kube::Error::Api(e)) if e.code == 404 => {}
        Err(e) => return Err(Error::Kube(e)),
    }

    let lp = ListParams::default().labels(&format!(
        "{}={},{}={}",
        labels::COMPONENT_KEY,
        labels::COMPONENT_INVENTORY_VALUE,
        labels::RELEASE_UUID_KEY,
        release_uuid
    ));
    let list = api.list(&lp).await.map_err(Error::Kube)?;
    match list.items.into_iter().next() {
        Some(secret) => Ok(Some(Found { secret })),
        None => Ok(None),
    }
}

/// Creates the inventory Secret if it does not yet exist.
#[tracing::instrument(skip(client, secret))]
pub async fn create(client: &Client, namespace: &str, secret: Secret) -> Result<Secret, Error> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    api.create(&PostParams::default(), &secret).await.map_err(Error::Kube)
}

/// Replaces the inventory Secret, carrying forward `resource_version` for
/// optimistic concurrency. A `409 Conflict` is surfaced as
/// [`Error::InventoryConflict`] so callers can retry the read-modify-write.
#[tracing::instrument(skip(client, secret))]
pub async fn update(client: &Client, namespace: &str, name: &str, mut secret: Secret, resource_version: Option<String>) -> Result<Secret, Error> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    secret.metadata.resource_version = resource_version;
    match api.replace(name, &PostParams::default(), &secret).await {
        Ok(s) => Ok(s),
        Err(kube::Error::Api(e)) if e.code == 409 => {
            Err(Error::InventoryConflict(format!("{name}: resourceVersion changed concurrently")))
        }
        Err(e) => Err(Error::Kube(e)),
    }
}

/// Deletes the inventory Secret. A 404 is treated as success.
#[tracing::instrument(skip(client))]
pub async fn delete(client: &Client, namespace: &str, name: &str) -> Result<(), Error> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    match api.delete(name, &kube::api::DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(Error::Kube(e)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use http::{Request, Response, StatusCode};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::client::Body;
    use serde_json::json;

    use super::*;

    pub use test_log::test;

    fn test_secret(name: &str) -> Secret {
        let mut labels = BTreeMap::new();
        labels.insert(labels::RELEASE_UUID_KEY.to_string(), Uuid::nil().to_string());
        Secret { metadata: ObjectMeta { name: Some(name.to_string()), labels: Some(labels), ..Default::default() }, ..Default::default() }
    }

    #[test(tokio::test)]
    async fn find_falls_back_to_label_scan_on_direct_get_404() {
        let (mock_service, mut handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let client = Client::new(mock_service, "default");

        let server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("first request");
            assert_eq!(request.method(), http::Method::GET);
            let err = json!({
                "code": 404,
                "status": "Failure",
                "reason": "NotFound",
                "details": {"group": "", "kind": "Secret", "name": "opm.demo.00000000-0000-0000-0000-000000000000"},
            });
            send.send_response(
                Response::builder().status(StatusCode::NOT_FOUND).body(Body::from(serde_json::to_vec(&err).unwrap())).unwrap(),
            );

            let (request, send) = handle.next_request().await.expect("second request");
            assert!(request.uri().query().unwrap_or_default().contains("labelSelector"));
            let found = test_secret("opm.demo.00000000-0000-0000-0000-000000000000");
            let list = json!({
                "apiVersion": "v1",
                "kind": "SecretList",
                "metadata": {},
                "items": [found],
            });
            send.send_response(Response::builder().status(StatusCode::OK).body(Body::from(serde_json::to_vec(&list).unwrap())).unwrap());
        });

        let found = find(&client, "default", "demo", Uuid::nil()).await.unwrap();
        assert!(found.is_some());
        tokio::time::timeout(std::time::Duration::from_secs(1), server).await.unwrap().unwrap();
    }
}
