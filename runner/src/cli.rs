//! Command-line surface of the `reconcile` binary

use clap::{Args, Parser, Subcommand};
use reconciler_core::Language;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reconcile")]
#[command(author, version, about = "Reconcile wallet UI/API state against backend truth", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML config file (defaults to ./reconciler.yaml when present)
    #[arg(short, long, global = true, env = "RECONCILER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision a logged-in test account
    Provision(ProvisionArgs),
    /// Deposit into a fresh account and wait for the wallet to show it
    Deposit(DepositArgs),
    /// Inspect the account ledger
    #[command(subcommand)]
    Accounts(AccountsCommand),
    /// Recent reconciliation outcomes
    History(HistoryArgs),
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[arg(short, long, default_value = "en", value_parser = parse_language)]
    pub language: Language,

    /// Log into the configured seeded account instead of registering
    #[arg(long)]
    pub seeded: bool,
}

#[derive(Args, Debug)]
pub struct DepositArgs {
    #[arg(short, long)]
    pub amount: f64,

    #[arg(short, long, default_value = "en", value_parser = parse_language)]
    pub language: Language,
}

#[derive(Subcommand, Debug)]
pub enum AccountsCommand {
    /// List recorded accounts, newest first
    List {
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Flag every registered account under a tag for cleanup
    Cleanup {
        #[arg(short, long)]
        tag: String,
    },
    /// Decrypt the stored password of one account
    Reveal { username: String },
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: i64,
}

fn parse_language(s: &str) -> Result<Language, String> {
    s.parse::<Language>().map_err(|e| e.to_string())
}
