//! `opm` — render and manage declarative module releases (spec §6).

mod args;
mod client;
mod commands;
mod exit;
mod logging;
mod pipeline;
mod selector;

use std::process::ExitCode;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::error;

fn main() -> ExitCode {
    logging::init();

    let cmd = args::command();
    let matches = cmd.get_matches();

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match rt.block_on(dispatch(&matches)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit::code_for(&e) as u8)
        }
    }
}

async fn dispatch(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let (_, mod_matches) = matches.subcommand().expect("subcommand_required");
    let (sub, sub_matches) = mod_matches.subcommand().expect("subcommand_required");

    let cancel = CancellationToken::new();
    let ctrlc_token = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("error waiting for ctrl-c: {e}");
        }
        ctrlc_token.cancel();
    });

    match sub {
        "build" => commands::build::run(commands::build::Args::try_from(sub_matches)?, cancel).await,
        "apply" => commands::apply::run(commands::apply::Args::try_from(sub_matches)?, cancel).await,
        "diff" => commands::diff::run(args::RenderArgs::try_from(sub_matches)?, cancel).await,
        "delete" => commands::delete::run(commands::delete::Args::try_from(sub_matches)?).await,
        "status" => commands::status::run(commands::status::Args::try_from(sub_matches)?).await,
        other => unreachable!("unknown subcommand {other:?}"),
    }
}
