//! Builds a `kube::Client` from inferred config, honoring an explicit
//! kubeconfig path / context override the same way the teacher defers to
//! `kube::Config::infer` in `run` (kubeconfig *parsing itself* stays an
//! out-of-scope design concern; this is the one concrete call site).

use std::path::Path;

use anyhow::Context as _;

pub async fn build(kubeconfig: Option<&Path>, context: Option<&str>) -> anyhow::Result<kube::Client> {
    let mut options = kube::config::KubeConfigOptions::default();
    options.context = context.map(str::to_string);

    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = kube::config::Kubeconfig::read_from(path)
                .with_context(|| format!("reading kubeconfig at {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &options).await.context("building config from kubeconfig")?
        }
        None => kube::Config::infer().await.context("inferring kubeconfig")?,
    };

    let client = kube::client::ClientBuilder::try_from(config).context("building client")?.build();
    Ok(client)
}
