mod cli;
mod clock;
mod config;
mod manager;
mod model;
mod storage;
mod user;

use std::{io, process};

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;

/// Env var holding the log filter, e.g. `GOALTRACK_LOG=debug`.
const LOG_ENV: &str = "GOALTRACK_LOG";

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(cli, &config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
