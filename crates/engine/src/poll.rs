//! Bounded retry / polling driver
//!
//! One uniform interval / max-wait policy for everything that settles
//! asynchronously (deposit approval, reward crediting, claim state).
//! State machine: `Pending -> Polling -> Matched | TimedOut`, with fatal
//! errors ending the cycle early.

use crate::compare::Comparator;
use reconciler_core::config::PollConfig;
use reconciler_core::{ComparisonRule, Error, PollResult, PollState, Result, Snapshot, SnapshotPair};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Interval between samples and the total budget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    pub fn from_config(config: &PollConfig) -> Self {
        Self::new(config.interval(), config.max_wait())
    }
}

/// Outcome of one attempt inside the loop
enum Attempt<T> {
    Done(T),
    Retry(Option<Error>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PollDriver {
    policy: PollPolicy,
    comparator: Comparator,
}

impl PollDriver {
    pub fn new(policy: PollPolicy, comparator: Comparator) -> Self {
        Self { policy, comparator }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    /// Sleep until the next attempt, or return `false` once the deadline
    /// has passed. Never sleeps past the deadline.
    async fn pause(&self, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(self.policy.interval.min(deadline - now)).await;
        true
    }

    /// Run `attempt` until it yields `Some`, the budget runs out
    /// (`Error::Timeout`) or it fails with a non-transient error.
    ///
    /// `Ok(None)`, `Mismatch` and `ElementNotFound` mean "not yet".
    pub async fn poll<T, F, Fut>(&self, description: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let start = Instant::now();
        let deadline = start + self.policy.max_wait;
        let mut attempts = 0u32;
        let mut last_error = None;
        debug!("{}: {} -> {}", description, PollState::Pending, PollState::Polling);

        loop {
            attempts += 1;
            match attempt().await {
                Ok(Some(value)) => {
                    debug!("{}: {} after {} attempt(s)", description, PollState::Matched, attempts);
                    return Ok(value);
                }
                Ok(None) => last_error = None,
                Err(e) if e.is_transient() => last_error = Some(e),
                Err(e) => {
                    warn!("{}: {} on attempt {}: {}", description, PollState::Failed, attempts, e);
                    return Err(e);
                }
            }

            if !self.pause(deadline).await {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                warn!("{}: {} after {} attempt(s)", description, PollState::TimedOut, attempts);
                return Err(match last_error {
                    Some(Error::ElementNotFound { locator, .. }) => Error::ElementNotFound {
                        locator,
                        timeout_ms: elapsed_ms,
                    },
                    Some(reason) => Error::Timeout {
                        what: format!("{} ({})", description, reason),
                        elapsed_ms,
                    },
                    None => Error::Timeout {
                        what: description.to_string(),
                        elapsed_ms,
                    },
                });
            }
        }
    }

    /// Wait until `predicate` holds. Replaces fixed sleeps after actions
    /// whose effect shows up later.
    pub async fn settle<F, Fut>(&self, description: &str, mut predicate: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        self.poll(description, || {
            let check = predicate();
            async move { check.await.map(|done| done.then_some(())) }
        })
        .await
    }

    /// Fetch both sides, compare, repeat until matched or out of budget.
    ///
    /// Both closures are called on every attempt, so a moving expected
    /// value is tracked as well as a moving observed one.
    pub async fn reconcile<E, EF, O, OF>(
        &self,
        rule: &ComparisonRule,
        mut expected: E,
        mut observed: O,
    ) -> PollResult
    where
        E: FnMut() -> EF,
        EF: Future<Output = Result<Snapshot>>,
        O: FnMut() -> OF,
        OF: Future<Output = Result<Snapshot>>,
    {
        let start = Instant::now();
        let deadline = start + self.policy.max_wait;
        let mut attempts = 0u32;
        let mut last: Option<SnapshotPair> = None;
        let mut field = String::from("<unsampled>");

        loop {
            attempts += 1;
            let outcome = self.reconcile_once(rule, &mut expected, &mut observed, &mut last).await;

            if let Some(pair) = &last {
                if attempts == 1 || field != pair.expected.field_name() {
                    field = pair.expected.field_name().to_string();
                    info!("{}: {} -> {} ({})", field, PollState::Pending, PollState::Polling, rule.kind());
                }
            }

            let last_error = match outcome {
                Ok(Attempt::Done(pair)) => {
                    info!("{}: {} after {} attempt(s)", pair.expected.field_name(), PollState::Matched, attempts);
                    return PollResult::Matched {
                        attempts,
                        elapsed: start.elapsed(),
                        pair,
                    };
                }
                Ok(Attempt::Retry(reason)) => reason,
                Err(error) => {
                    warn!("{}: {} on attempt {}: {}", field, PollState::Failed, attempts, error);
                    return PollResult::Error {
                        attempts,
                        elapsed: start.elapsed(),
                        error,
                        last,
                    };
                }
            };

            if let Some(reason) = &last_error {
                debug!("{}: attempt {} not matched: {}", field, attempts, reason);
            }

            if !self.pause(deadline).await {
                let result = PollResult::TimedOut {
                    attempts,
                    elapsed: start.elapsed(),
                    last,
                    last_error,
                };
                warn!("{}: {}", field, result);
                return result;
            }
        }
    }

    async fn reconcile_once<E, EF, O, OF>(
        &self,
        rule: &ComparisonRule,
        expected: &mut E,
        observed: &mut O,
        last: &mut Option<SnapshotPair>,
    ) -> Result<Attempt<SnapshotPair>>
    where
        E: FnMut() -> EF,
        EF: Future<Output = Result<Snapshot>>,
        O: FnMut() -> OF,
        OF: Future<Output = Result<Snapshot>>,
    {
        let expected = match expected().await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_transient() => return Ok(Attempt::Retry(Some(e))),
            Err(e) => return Err(e),
        };
        let observed = match observed().await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_transient() => return Ok(Attempt::Retry(Some(e))),
            Err(e) => return Err(e),
        };

        let verdict = self.comparator.check(rule, &expected, &observed);
        let pair = SnapshotPair { expected, observed };
        match verdict {
            Ok(()) => Ok(Attempt::Done(pair)),
            Err(e) if e.is_transient() => {
                *last = Some(pair);
                Ok(Attempt::Retry(Some(e)))
            }
            Err(e) => {
                *last = Some(pair);
                Err(e)
            }
        }
    }
}
