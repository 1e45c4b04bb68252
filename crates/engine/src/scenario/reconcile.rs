//! Built-in reconciliations: UI / API state checked against backend truth

use crate::poll::PollDriver;
use crate::sampler::{ClaimState, Locator, Sampler};
use reconciler_core::{
    ComparisonRule, Error, Mismatch, Money, PollResult, Result, RewardDelta, RuleKind, Snapshot, TestAccount, Value,
    ValueKind,
};
use reconciler_networking::{api, Fetcher, Query};
use std::future::Future;
use tracing::info;

/// Everything a reconciliation needs for one account
#[derive(Clone)]
pub struct ReconcileContext {
    pub account: TestAccount,
    pub fetcher: Fetcher,
    pub driver: PollDriver,
    pub sampler: Option<Sampler>,
}

impl ReconcileContext {
    /// `fetcher` must be authenticated as `account`; fixture steps also
    /// need the admin token on its client.
    pub fn new(account: TestAccount, fetcher: Fetcher, driver: PollDriver) -> Self {
        Self {
            account,
            fetcher,
            driver,
            sampler: None,
        }
    }

    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    fn sampler(&self, what: &str) -> Result<&Sampler> {
        self.sampler
            .as_ref()
            .ok_or_else(|| Error::ConfigError(format!("{} needs a UI surface", what)))
    }
}

/// Per-field outcome of a reward check
#[derive(Debug)]
pub struct FieldOutcome {
    pub field: String,
    pub result: PollResult,
}

/// Deposit `amount`, approve it through the fixture endpoint and poll the
/// wallet until it shows `before + amount` within the currency epsilon.
///
/// A receipt echoing a different amount than requested is a `Mismatch`
/// on `deposit_amount`, and the deposit is not approved.
pub async fn verify_deposit_credit(ctx: &ReconcileContext, amount: f64) -> Result<PollResult> {
    let fetcher = &ctx.fetcher;
    let before = fetcher.fetch(&Query::WalletBalance).await?;
    let before_amount = numeric(&before)?;

    let requested = Money::new(amount).round_cents();
    let receipt = api::submit_deposit(fetcher.client(), amount).await?;
    if Money::new(receipt.amount).cents() != requested.cents() {
        return Err(Mismatch {
            field: "deposit_amount".into(),
            rule: RuleKind::NumericEpsilon,
            expected: Value::Amount(requested.as_f64()),
            observed: Value::Amount(receipt.amount),
            detail: Some(format!("receipt for deposit {}", receipt.deposit_id)),
        }
        .into());
    }
    api::approve_deposit(fetcher.client(), &receipt).await?;

    // Expected balance comes from what was asked for, never from the echo
    let expected = before.derive(Value::Amount(before_amount + requested.as_f64()));
    info!(
        "Waiting for {} to reach {} after deposit {}",
        before.field_name(),
        expected.value(),
        receipt.deposit_id
    );

    let rule = ComparisonRule::NumericEpsilon {
        epsilon: ctx.driver.comparator().epsilon(),
    };
    let expected = &expected;
    Ok(ctx
        .driver
        .reconcile(
            &rule,
            move || async move { Ok(expected.clone()) },
            move || async move { fetcher.fetch(&Query::WalletBalance).await },
        )
        .await)
}

/// Claim a completed mission and wait for both sides to agree it is claimed.
///
/// Preconditions are checked first: progress equals target exactly, the API
/// still reports the mission unclaimed and the UI button offers the
/// localized "Claim". `claim` performs the click (or the
/// equivalent API call). Afterwards the API must report `is_claimed == 1`
/// and the button must be disabled and read the localized "Claimed".
/// Returns the API result when it never matched, the UI result otherwise.
pub async fn verify_mission_claim<F>(
    ctx: &ReconcileContext,
    mission_id: i64,
    button: &Locator,
    claim: F,
) -> Result<PollResult>
where
    F: Future<Output = Result<()>>,
{
    let sampler = ctx.sampler("mission claim check")?;
    let fetcher = &ctx.fetcher;

    let mission = fetcher.fetch_mission(mission_id).await?;
    ctx.driver
        .comparator()
        .judge(
            &Query::MissionProgress(mission_id).field_name(),
            &ComparisonRule::Exact,
            &Value::Amount(mission.target),
            &Value::Amount(mission.progress),
        )
        .map_err(|mut m| {
            let state = if mission.progress > mission.target {
                "progress overshoots target"
            } else {
                "mission not complete"
            };
            m.detail = Some(state.into());
            Error::from(m)
        })?;
    if mission.claimed() {
        return Err(Mismatch {
            field: Query::MissionClaimed(mission_id).field_name(),
            rule: RuleKind::Exact,
            expected: Value::Count(0),
            observed: Value::Count(mission.is_claimed),
            detail: Some("already claimed before the claim action".into()),
        }
        .into());
    }

    let before = sampler.sample_button(button).await?;
    if sampler.classify_claim(&before.label) != ClaimState::Claimable || !before.enabled {
        return Err(Mismatch {
            field: format!("mission_{}_button", mission_id),
            rule: RuleKind::Exact,
            expected: Value::Text(sampler.parser().settings().claim.clone()),
            observed: Value::Text(before.label),
            detail: Some(format!("button does not offer a claim (enabled: {})", before.enabled)),
        }
        .into());
    }

    claim.await?;

    let query = Query::MissionClaimed(mission_id);
    let field = query.field_name();
    let claimed = Snapshot::computed(field.clone(), Value::Count(1));
    let (claimed, query, field) = (&claimed, &query, field.as_str());

    let api_result = ctx
        .driver
        .reconcile(
            &ComparisonRule::Exact,
            move || async move { Ok(claimed.clone()) },
            move || async move { fetcher.fetch(query).await },
        )
        .await;
    if !api_result.is_matched() {
        return Ok(api_result);
    }

    Ok(ctx
        .driver
        .reconcile(
            &ComparisonRule::Exact,
            move || async move { Ok(claimed.clone()) },
            move || async move { sampler.sample_claimed(field, button).await },
        )
        .await)
}

/// UI "remaining to next VIP" must equal `next_vip.recharge - user.paysum`
/// exactly (same currency unit on both sides).
pub async fn verify_vip_remaining(ctx: &ReconcileContext, locator: &Locator) -> Result<PollResult> {
    let sampler = ctx.sampler("VIP remaining check")?;
    let fetcher = &ctx.fetcher;
    let field = Query::VipRemaining.field_name();
    let field = field.as_str();

    Ok(ctx
        .driver
        .reconcile(
            &ComparisonRule::Exact,
            move || async move { fetcher.fetch(&Query::VipRemaining).await },
            move || async move { sampler.sample(field, locator, ValueKind::Amount).await },
        )
        .await)
}

/// Read every balance the reward touches, run `trigger` (claim, check-in,
/// spin), then poll each balance for its own increase. Kinds are
/// independent: a reward with coin and bonus grows both.
pub async fn verify_reward_credit<F>(
    ctx: &ReconcileContext,
    reward_dict: &serde_json::Value,
    daily_ticket: bool,
    trigger: F,
) -> Result<Vec<FieldOutcome>>
where
    F: Future<Output = Result<()>>,
{
    let mut delta = RewardDelta::from_reward_dict(reward_dict)?;
    if daily_ticket {
        delta = delta.with_daily_ticket();
    }
    let fetcher = &ctx.fetcher;

    let mut befores = Vec::new();
    for (field, increase) in delta.by_balance_field() {
        let query = Query::for_balance_field(field)
            .ok_or_else(|| Error::InvalidData(format!("no backend query for balance '{}'", field)))?;
        let before = fetcher.fetch(&query).await?;
        befores.push((query, before, increase));
    }

    trigger.await?;

    let mut outcomes = Vec::with_capacity(befores.len());
    for (query, before, increase) in &befores {
        info!("Expecting {} to grow by {} from {}", before.field_name(), increase, before.value());
        let result = ctx
            .driver
            .reconcile(
                &ComparisonRule::increase_by(*increase),
                move || async move { Ok(before.clone()) },
                move || async move { fetcher.fetch(query).await },
            )
            .await;
        outcomes.push(FieldOutcome {
            field: before.field_name().to_string(),
            result,
        });
    }
    Ok(outcomes)
}

fn numeric(snapshot: &Snapshot) -> Result<f64> {
    snapshot
        .value()
        .as_f64()
        .ok_or_else(|| Error::InvalidData(format!("{} is not numeric", snapshot)))
}
