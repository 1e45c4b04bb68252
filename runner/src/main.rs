//! Reconciler Runner - `reconcile` command-line entry point

mod cli;
mod commands;
mod config_loader;

use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "reconciler_runner=info,reconciler_engine=info,reconciler_networking=info";

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    // stdout carries command output; logs go to stderr
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = config_loader::load(cli.config.as_deref())?;
    tracing::info!("Backend {}", config.backend.base_url);

    match cli.command {
        Commands::Provision(args) => commands::provision(&config, args).await,
        Commands::Deposit(args) => commands::deposit(&config, args).await,
        Commands::Accounts(command) => commands::accounts(&config, command).await,
        Commands::History(args) => commands::history(&config, args).await,
    }
}
