//! Tracing setup: human-readable output on a terminal, JSON otherwise
//! (mirrors the teacher's `startup` wiring).

use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let is_tty = std::io::stdout().is_terminal();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(is_tty.then(tracing_subscriber::fmt::layer))
        .with((!is_tty).then(|| tracing_subscriber::fmt::layer().json()))
        .init();
}
