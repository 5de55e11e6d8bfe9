//! `opm mod build`: render only (spec §6).

use std::fs;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::args::RenderArgs;

pub struct Args {
    pub render: RenderArgs,
    pub output: String,
    pub split: bool,
    pub out_dir: PathBuf,
}

impl TryFrom<&clap::ArgMatches> for Args {
    type Error = anyhow::Error;

    fn try_from(m: &clap::ArgMatches) -> Result<Self, Self::Error> {
        Ok(Self {
            render: RenderArgs::try_from(m)?,
            output: m.get_one::<String>("output").unwrap().clone(),
            split: m.get_flag("split"),
            out_dir: m.get_one::<String>("out-dir").unwrap().into(),
        })
    }
}

#[tracing::instrument(skip(args, cancel))]
pub async fn run(args: Args, cancel: CancellationToken) -> anyhow::Result<()> {
    let rendered = crate::pipeline::run_render(&args.render, cancel).await?;

    if args.split {
        fs::create_dir_all(&args.out_dir)?;
        for resource in &rendered.resources {
            let ext = if args.output == "json" { "json" } else { "yaml" };
            let filename = format!("{}-{}.{ext}", resource.kind().to_lowercase(), resource.name());
            let text = serialize(&resource.object, &args.output)?;
            fs::write(args.out_dir.join(filename), text)?;
        }
        tracing::info!(count = rendered.resources.len(), dir = %args.out_dir.display(), "wrote split manifests");
        return Ok(());
    }

    match args.output.as_str() {
        "json" => {
            let docs: Vec<_> = rendered.resources.iter().map(|r| &r.object).collect();
            println!("{}", serde_json::to_string_pretty(&docs)?);
        }
        _ => {
            for resource in &rendered.resources {
                println!("---");
                print!("{}", serde_yaml::to_string(&resource.object)?);
            }
        }
    }
    Ok(())
}

fn serialize(object: &serde_json::Value, output: &str) -> anyhow::Result<String> {
    Ok(if output == "json" { serde_json::to_string_pretty(object)? } else { serde_yaml::to_string(object)? })
}
