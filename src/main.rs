#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! brick-volume: show Cinder volumes in use and the local devices backing them.

mod brick;
mod cinder;
mod cli;
mod commands;
mod config;
mod errors;
mod types;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use brick::HostInitiator;
use cinder::CinderClient;
use cli::{Cli, OutputCtx, write_error};
use commands::Mode;
use config::Config;
use types::ErrorOutput;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = Config::from_cli(&cli);
    let ctx = OutputCtx::new(cli.output);
    let initiator = HostInitiator::new(&config.initiator);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = commands::dispatch(
        Mode::from_cli(&cli),
        &initiator,
        || CinderClient::connect(&config.auth, config.timeout),
        &ctx,
        &mut out,
    );

    if let Err(err) = result {
        write_error(&ErrorOutput::from_error(&err), cli.output);
        std::process::exit(err.exit_code());
    }
}

/// Log to stderr. `--debug` wins over `RUST_LOG`; the default is warnings only.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
