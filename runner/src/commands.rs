//! Subcommand handlers

use crate::cli::{AccountsCommand, DepositArgs, HistoryArgs, ProvisionArgs};
use anyhow::{Context, Result};
use reconciler_core::{Config, Error, Language, PollResult, RuleKind, TestAccount};
use reconciler_engine::{
    verify_deposit_credit, AccountLedger, Comparator, PollDriver, PollPolicy, Provisioner, ReconcileContext, Scenario,
};
use reconciler_networking::{BackendClient, Fetcher};
use reconciler_persistence::sqlite::{self, VerificationEntry};
use reconciler_persistence::{Database, SecretEncryptor};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

async fn open_database(config: &Config) -> Result<Arc<Database>> {
    let db = Database::connect(Path::new(&config.database.path))
        .await
        .with_context(|| format!("Failed to open ledger at {}", config.database.path))?;
    Ok(Arc::new(db))
}

async fn provisioner(config: &Config, db: Arc<Database>) -> Result<Provisioner> {
    let client = BackendClient::from_config(&config.backend, Language::En)?;
    let encryptor = SecretEncryptor::for_this_machine().context("Failed to derive ledger key")?;
    Ok(Provisioner::new(client, config.provision.clone()).with_ledger(AccountLedger::new(db, encryptor)))
}

fn print_account(account: &TestAccount) {
    println!("username:  {}", account.username);
    println!("password:  ********");
    println!("user_id:   {}", account.user_id);
    println!("language:  {}", account.language);
    println!("seeded:    {}", account.seeded);
}

pub async fn provision(config: &Config, args: ProvisionArgs) -> Result<ExitCode> {
    let db = open_database(config).await?;
    let account = provisioner(config, db)
        .await?
        .provision(!args.seeded, args.language)
        .await?;
    print_account(&account);
    Ok(ExitCode::SUCCESS)
}

// ─── Deposit ─────────────────────────────────────────────────────────────

const DEPOSIT_SCENARIO: &str = "deposit_credit";

/// State threaded through the deposit scenario's steps
struct DepositRun {
    provisioner: Provisioner,
    driver: PollDriver,
    language: Language,
    amount: f64,
    context: Option<ReconcileContext>,
    outcome: Option<PollResult>,
}

impl DepositRun {
    fn context(&self) -> Result<&ReconcileContext, Error> {
        self.context
            .as_ref()
            .ok_or_else(|| Error::InvalidData("no account provisioned".to_string()))
    }
}

fn deposit_scenario() -> Scenario<DepositRun> {
    Scenario::new(DEPOSIT_SCENARIO)
        .step("provision fresh account", |run: &mut DepositRun| {
            Box::pin(async move {
                let account = run.provisioner.provision(true, run.language).await?;
                let fetcher = Fetcher::new(run.provisioner.client_for(&account));
                run.context = Some(ReconcileContext::new(account, fetcher, run.driver));
                Ok(())
            })
        })
        .step("deposit is credited", |run: &mut DepositRun| {
            Box::pin(async move {
                let outcome = verify_deposit_credit(run.context()?, run.amount).await?;
                let verdict = if outcome.is_matched() {
                    Ok(())
                } else {
                    Err(Error::InvalidData(format!("wallet_balance {}", outcome)))
                };
                run.outcome = Some(outcome);
                verdict
            })
        })
}

pub async fn deposit(config: &Config, args: DepositArgs) -> Result<ExitCode> {
    let db = open_database(config).await?;
    let mut run = DepositRun {
        provisioner: provisioner(config, db.clone()).await?,
        driver: PollDriver::new(
            PollPolicy::from_config(&config.poll),
            Comparator::new(config.comparator.currency_epsilon),
        ),
        language: args.language,
        amount: args.amount,
        context: None,
        outcome: None,
    };

    let report = deposit_scenario().run(&mut run).await;
    print!("{}", report);

    if let Some(outcome) = &run.outcome {
        println!("{}", outcome);
        let entry = VerificationEntry::from_poll(DEPOSIT_SCENARIO, "wallet_balance", RuleKind::NumericEpsilon, outcome);
        let id = sqlite::record_verification(db.pool(), &entry).await?;
        info!("Recorded verification {} ({})", id, entry.outcome);
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ─── Ledger views ────────────────────────────────────────────────────────

pub async fn accounts(config: &Config, command: AccountsCommand) -> Result<ExitCode> {
    let db = open_database(config).await?;
    match command {
        AccountsCommand::List { tag } => {
            let accounts = sqlite::list_accounts(db.pool(), tag.as_deref()).await?;
            for a in &accounts {
                println!(
                    "{:>5}  {:<12} {:>8}  {}  {:<8} {}{}",
                    a.id,
                    a.username,
                    a.user_id,
                    a.language,
                    a.tag,
                    a.created_at.format("%Y-%m-%d %H:%M:%S"),
                    if a.cleanup_requested { "  [cleanup]" } else { "" }
                );
            }
            let total = sqlite::count_accounts(db.pool(), tag.as_deref()).await?;
            println!("{} account(s)", total);
        }
        AccountsCommand::Cleanup { tag } => {
            let marked = sqlite::mark_cleanup(db.pool(), &tag).await?;
            println!("Marked {} account(s) tagged '{}' for cleanup", marked, tag);
        }
        AccountsCommand::Reveal { username } => {
            let secret = sqlite::get_account_password(db.pool(), &username)
                .await?
                .with_context(|| format!("No ledger entry for {}", username))?;
            let password = SecretEncryptor::for_this_machine()?.decrypt(&secret)?;
            println!("{}", password);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn history(config: &Config, args: HistoryArgs) -> Result<ExitCode> {
    let db = open_database(config).await?;
    for r in sqlite::recent_verifications(db.pool(), args.limit.max(1)).await? {
        println!(
            "{}  {:<16} {:<16} {:<18} {:<9} expected={} observed={} attempts={} {}ms",
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
            r.scenario,
            r.field,
            r.rule,
            r.outcome,
            r.expected.as_deref().unwrap_or("-"),
            r.observed.as_deref().unwrap_or("-"),
            r.attempts,
            r.elapsed_ms
        );
    }
    Ok(ExitCode::SUCCESS)
}
