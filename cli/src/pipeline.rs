//! Shared glue between the CLI args and [`render::render`].

use model::Options;
use tokio_util::sync::CancellationToken;

use crate::args::RenderArgs;

pub async fn run_render(args: &RenderArgs, cancel: CancellationToken) -> anyhow::Result<render::Rendered> {
    let module_path = render::resolve_module_path(&args.path);
    let options = Options { name: args.name.clone(), namespace: args.namespace.clone() };
    let values_refs: Vec<&std::path::Path> = args.values.iter().map(|p| p.as_path()).collect();

    let inputs = render::RenderInputs {
        module_path: &module_path,
        provider_path: &args.provider,
        options: &options,
        values_files: &values_refs,
    };

    render::render(inputs, cancel).await.map_err(anyhow::Error::from)
}
